//! The per-process worker seam.
//!
//! `corewatch-supervisor` never embeds a browser itself — that's an
//! external collaborator's job. What it owns is the *lifecycle*
//! contract: spawn, probe, terminate, and a crash signal, modeled here as
//! two traits so a real toolkit binding and a deterministic test double
//! can both satisfy the Supervisor's requirements.

use std::time::Duration;

use async_trait::async_trait;
use corewatch_isolation::{AppliedProxy, ViewSurfaceConfig};
use corewatch_types::{AccountId, CoreError, Result};
use tokio::process::Command;
use tokio::time::timeout;

/// Why a worker's lifetime ended without an explicit `destroy`/`terminate`
/// call.
#[derive(Debug, Clone)]
pub enum CrashReason {
    /// The process exited, expectedly or not, with this code (`None` if
    /// killed by a signal).
    Exited(Option<i32>),
    /// The liveness probe went unanswered for the hang timeout.
    Hung,
}

/// One live worker. Implementations must be safe to hold across await
/// points and to drop while still running (the Supervisor may abandon a
/// handle after a forced terminate timeout).
#[async_trait]
pub trait WorkerHandle: Send + Sync {
    fn pid(&self) -> Option<u32>;

    /// Best-effort memory/cpu sample. Returns
    /// `(memory_bytes, cpu_percent)`.
    async fn sample_resources(&self) -> Result<(u64, f32)>;

    /// A no-op scripted callback with a caller-supplied timeout. An `Err`
    /// or a timeout both mean "unresponsive" to the caller.
    async fn probe_liveness(&mut self, timeout_after: Duration) -> Result<()>;

    /// Request graceful close; if it doesn't complete within
    /// `timeout_after`, the caller is expected to call `force_terminate`.
    async fn request_close(&mut self) -> Result<()>;

    /// Reload the view's current page.
    async fn reload(&mut self, ignore_cache: bool) -> Result<()>;

    /// Navigate the view to `url`.
    async fn load_url(&mut self, url: &str) -> Result<()>;

    /// Immediate, non-negotiable teardown.
    async fn force_terminate(&mut self) -> Result<()>;

    /// Resolves once the worker exits for any reason *other than* a
    /// `request_close`/`force_terminate` the Supervisor itself issued —
    /// i.e. an actual crash or hang the Supervisor needs to react to.
    async fn wait_crash(&mut self) -> CrashReason;
}

/// Builds a [`WorkerHandle`] for one account. The Instance Supervisor
/// calls `spawn` once per `create`; everything about *how* the isolated
/// browser-like surface is rendered is this trait's implementation's
/// concern, not the Supervisor's.
#[async_trait]
pub trait WorkerSpawner: Send + Sync {
    async fn spawn(
        &self,
        account_id: &AccountId,
        view_config: &ViewSurfaceConfig,
        proxy: &AppliedProxy,
    ) -> Result<Box<dyn WorkerHandle>>;
}

/// Production spawner: a real, physically separate OS process per account
///. The concrete executable is configurable — in a full desktop
/// build it is the embedding toolkit's own renderer-host binary; tests and
/// headless deployments point it at any long-lived placeholder command.
pub struct ProcessWorkerSpawner {
    program: String,
    args: Vec<String>,
}

impl ProcessWorkerSpawner {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }
}

#[async_trait]
impl WorkerSpawner for ProcessWorkerSpawner {
    async fn spawn(
        &self,
        account_id: &AccountId,
        view_config: &ViewSurfaceConfig,
        proxy: &AppliedProxy,
    ) -> Result<Box<dyn WorkerHandle>> {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command.env("COREWATCH_ACCOUNT_ID", account_id.to_string());
        command.env("COREWATCH_SESSION_LABEL", &view_config.session_label);
        if proxy.enabled {
            if let Some(host) = &proxy.host {
                command.env("COREWATCH_PROXY_HOST", host);
            }
        }
        command.kill_on_drop(true);
        let child = command
            .spawn()
            .map_err(|e| CoreError::InstanceCrash { account_id: account_id.clone(), message: format!("spawn worker process: {e}") })?;
        Ok(Box::new(ProcessWorkerHandle { child, account_id: account_id.clone() }))
    }
}

struct ProcessWorkerHandle {
    child: tokio::process::Child,
    account_id: AccountId,
}

#[async_trait]
impl WorkerHandle for ProcessWorkerHandle {
    fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    async fn sample_resources(&self) -> Result<(u64, f32)> {
        // Precise per-process sampling is platform-specific and out of
        // scope here; callers needing real figures should provide their
        // own `WorkerSpawner` that wraps a sampling library.
        Ok((0, 0.0))
    }

    async fn probe_liveness(&mut self, timeout_after: Duration) -> Result<()> {
        let pid = self.child.id();
        match timeout(timeout_after, async { self.child.try_wait() }).await {
            Ok(Ok(None)) => Ok(()), // still running
            Ok(Ok(Some(_status))) => Err(CoreError::InstanceCrash {
                account_id: self.account_id.clone(),
                message: format!("worker pid {pid:?} already exited"),
            }),
            Ok(Err(e)) => Err(CoreError::InstanceCrash { account_id: self.account_id.clone(), message: e.to_string() }),
            Err(_) => Err(CoreError::Unresponsive { account_id: self.account_id.clone() }),
        }
    }

    async fn request_close(&mut self) -> Result<()> {
        // tokio::process exposes no portable "ask nicely" signal; a real
        // toolkit binding would send its own close-window message here.
        // The generic process spawner relies on the Supervisor's
        // `timeoutMs` window expiring into `force_terminate`.
        Ok(())
    }

    async fn reload(&mut self, _ignore_cache: bool) -> Result<()> {
        // A real toolkit binding forwards this to the embedded view's own
        // navigation reload; the generic process spawner has no view to
        // address directly.
        Ok(())
    }

    async fn load_url(&mut self, _url: &str) -> Result<()> {
        Ok(())
    }

    async fn force_terminate(&mut self) -> Result<()> {
        self.child
            .kill()
            .await
            .map_err(|e| CoreError::RestartFailure { account_id: self.account_id.clone(), message: e.to_string() })
    }

    async fn wait_crash(&mut self) -> CrashReason {
        match self.child.wait().await {
            Ok(status) => CrashReason::Exited(status.code()),
            Err(_) => CrashReason::Exited(None),
        }
    }
}

