//! Per-instance actor: the task that exclusively owns one account's
//! [`WorkerHandle`] for its entire lifetime and implements the
//! crash-supervision and restart policy.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::time::sleep_until;
use tracing::info;

use corewatch_isolation::{self, ContentScriptInjector, ViewSurfaceConfig};
use corewatch_monitor::{EventBus, EventSource, Notification};
use corewatch_types::{AccountId, AccountRecord, CoreError, InstanceState, InstanceStatus, ProxySettings, Result};

use crate::crash::CrashWindow;
use crate::worker::{CrashReason, WorkerHandle, WorkerSpawner};
use crate::SupervisorConfig;

pub(crate) enum InstanceCommand {
    Destroy { timeout_after: Duration, reply: oneshot::Sender<()> },
    UpdateProxy { proxy: ProxySettings, reply: oneshot::Sender<Result<()>> },
    HealthProbe { reply: oneshot::Sender<()> },
    ResetCrashWindow { reply: oneshot::Sender<()> },
    Reload { ignore_cache: bool, reply: oneshot::Sender<Result<()>> },
    LoadUrl { url: String, reply: oneshot::Sender<Result<()>> },
}

/// What the Supervisor keeps for a live instance: a mailbox to send
/// commands through, and a cheaply-readable status cache the actor keeps
/// current. The Supervisor never touches `handle` directly — only the
/// actor does.
pub(crate) struct InstanceRef {
    pub(crate) commands: mpsc::Sender<InstanceCommand>,
    pub(crate) status: Arc<RwLock<InstanceStatus>>,
    pub(crate) record: Arc<RwLock<AccountRecord>>,
    pub(crate) join: tokio::task::JoinHandle<()>,
}

pub(crate) struct InstanceActor {
    pub(crate) account_id: AccountId,
    pub(crate) record: Arc<RwLock<AccountRecord>>,
    pub(crate) handle: Option<Box<dyn WorkerHandle>>,
    pub(crate) status: Arc<RwLock<InstanceStatus>>,
    pub(crate) crash_window: CrashWindow,
    pub(crate) config: Arc<SupervisorConfig>,
    pub(crate) spawner: Arc<dyn WorkerSpawner>,
    pub(crate) injector: Arc<dyn ContentScriptInjector>,
    pub(crate) profiles_root: PathBuf,
    pub(crate) bus: Arc<EventBus>,
    pub(crate) commands: mpsc::Receiver<InstanceCommand>,
}

impl InstanceActor {
    pub(crate) async fn run(mut self) {
        self.inject_and_mark_running().await;

        loop {
            let Some(handle) = self.handle.as_mut() else {
                // Between a crash and a scheduled restart there is no live
                // handle to wait on; only commands can move things forward.
                match self.commands.recv().await {
                    Some(InstanceCommand::Destroy { reply, .. }) => {
                        let _ = reply.send(());
                        return;
                    }
                    Some(cmd) => self.handle_command(cmd).await,
                    None => return,
                }
                continue;
            };

            tokio::select! {
                crash = handle.wait_crash() => {
                    if self.on_crash(crash).await {
                        return;
                    }
                }
                maybe_cmd = self.commands.recv() => {
                    match maybe_cmd {
                        Some(InstanceCommand::Destroy { timeout_after, reply }) => {
                            self.destroy_worker(timeout_after).await;
                            let _ = reply.send(());
                            return;
                        }
                        Some(cmd) => self.handle_command(cmd).await,
                        None => {
                            self.destroy_worker(self.config.destroy_timeout).await;
                            return;
                        }
                    }
                }
            }
        }
    }

    async fn handle_command(&mut self, cmd: InstanceCommand) {
        match cmd {
            InstanceCommand::Destroy { reply, .. } => {
                let _ = reply.send(());
            }
            InstanceCommand::UpdateProxy { proxy, reply } => {
                let result = self.update_proxy(proxy).await;
                let _ = reply.send(result);
            }
            InstanceCommand::HealthProbe { reply } => {
                self.probe_health().await;
                let _ = reply.send(());
            }
            InstanceCommand::ResetCrashWindow { reply } => {
                self.crash_window.reset();
                let _ = reply.send(());
            }
            InstanceCommand::Reload { ignore_cache, reply } => {
                let result = self.reload(ignore_cache).await;
                let _ = reply.send(result);
            }
            InstanceCommand::LoadUrl { url, reply } => {
                let result = self.load_url(url).await;
                let _ = reply.send(result);
            }
        }
    }

    /// Drive from `starting` to `running`/`error`: apply the content-script
    /// injection hook. This generic worker model has
    /// no separate page-load signal distinct from a successful spawn, so
    /// spawn completion stands in for `load-finished`.
    async fn inject_and_mark_running(&mut self) {
        let account_id = self.account_id.clone();
        match self.injector.inject(&account_id).await {
            Ok(()) => {
                let mut status = self.status.write().await;
                status.state = InstanceState::Running;
                status.last_heartbeat = Some(Utc::now());
                let snapshot = status.clone();
                drop(status);
                self.bus.notify(Notification::InstanceStatusChanged { account_id: account_id.clone(), status: snapshot });
                self.bus.notify(Notification::ViewReady { account_id });
            }
            Err(error) => {
                self.bus.publish_error(EventSource::Supervisor, &error).await;
                let mut status = self.status.write().await;
                status.state = InstanceState::Error;
                status.last_error = Some(error.to_string());
                let snapshot = status.clone();
                drop(status);
                self.bus.notify(Notification::AccountError {
                    account_id: account_id.clone(),
                    category: error.category().to_string(),
                    message: error.to_string(),
                });
                self.bus.notify(Notification::InstanceStatusChanged { account_id, status: snapshot });
                // the view continues to exist so the user can correct
                // configuration — don't tear down.
            }
        }
    }

    /// Returns `true` when the actor should exit its run loop (crash
    /// threshold exceeded and no restart was scheduled; the caller treats
    /// this as a terminal, but still-registered, `crashed` instance — so
    /// we don't actually return here; see below).
    async fn on_crash(&mut self, reason: CrashReason) -> bool {
        self.handle = None;
        let now = Utc::now();
        let count = self.crash_window.record(now);

        let message = match reason {
            CrashReason::Exited(code) => format!("worker process exited (code {code:?})"),
            CrashReason::Hung => "worker did not respond to a liveness probe".to_string(),
        };
        let error = CoreError::InstanceCrash { account_id: self.account_id.clone(), message };
        self.bus.publish_error(EventSource::Supervisor, &error).await;

        let mut status = self.status.write().await;
        status.crash_count_in_window = count;
        status.pid = None;

        if count <= self.config.max_crash_count {
            status.state = InstanceState::Starting;
            status.last_error = Some(error.to_string());
            let snapshot = status.clone();
            drop(status);
            self.bus.notify(Notification::InstanceStatusChanged { account_id: self.account_id.clone(), status: snapshot });
            self.schedule_restart().await
        } else {
            status.state = InstanceState::Crashed;
            status.last_error = Some(error.to_string());
            let snapshot = status.clone();
            drop(status);
            let threshold_error = CoreError::CrashThresholdExceeded { account_id: self.account_id.clone(), crash_count: count };
            self.bus.publish_error(EventSource::Supervisor, &threshold_error).await;
            self.bus.notify(Notification::ViewCrashed { account_id: self.account_id.clone() });
            self.bus.notify(Notification::InstanceStatusChanged { account_id: self.account_id.clone(), status: snapshot });
            // Stay alive (registered, `crashed`, no handle) so an explicit
            // `restart` can still find and reset this instance; only an
            // explicit `Destroy` command or a future restart command ends
            // the actor.
            self.wait_for_command_while_crashed().await
        }
    }

    /// While `crashed`, the only things that can happen are `destroy` or
    /// an external reset via `restart` (modeled here as `ResetCrashWindow`
    /// followed by the Supervisor re-issuing a respawn through the normal
    /// command path — see `InstanceSupervisor::restart`).
    async fn wait_for_command_while_crashed(&mut self) -> bool {
        loop {
            match self.commands.recv().await {
                Some(InstanceCommand::Destroy { timeout_after, reply }) => {
                    self.destroy_worker(timeout_after).await;
                    let _ = reply.send(());
                    return true;
                }
                Some(InstanceCommand::ResetCrashWindow { reply }) => {
                    self.crash_window.reset();
                    if let Err(error) = self.respawn().await {
                        self.bus.publish_error(EventSource::Supervisor, &error).await;
                        let _ = reply.send(());
                        continue;
                    }
                    let _ = reply.send(());
                    return false;
                }
                Some(cmd) => self.handle_command(cmd).await,
                None => return true,
            }
        }
    }

    /// Waits out the crash-to-restart delay, but stays responsive to
    /// commands in the meantime — in particular a `destroy` arriving
    /// mid-wait cancels the deferred restart entirely rather than racing it.
    async fn schedule_restart(&mut self) -> bool {
        let deadline = tokio::time::Instant::now() + self.config.restart_delay;
        loop {
            tokio::select! {
                _ = sleep_until(deadline) => {
                    if let Err(error) = self.respawn().await {
                        self.bus.publish_error(EventSource::Supervisor, &CoreError::RestartFailure {
                            account_id: self.account_id.clone(),
                            message: error.to_string(),
                        }).await;
                        let mut status = self.status.write().await;
                        status.state = InstanceState::Error;
                        status.last_error = Some(error.to_string());
                    }
                    return false;
                }
                maybe_cmd = self.commands.recv() => {
                    match maybe_cmd {
                        Some(InstanceCommand::Destroy { reply, .. }) => {
                            let _ = reply.send(());
                            return true;
                        }
                        Some(cmd) => self.handle_command(cmd).await,
                        None => return true,
                    }
                }
            }
        }
    }

    async fn respawn(&mut self) -> Result<()> {
        let record = self.record.read().await.clone();
        let applied_proxy = corewatch_isolation::apply_proxy(&record.proxy)?;
        corewatch_isolation::partition::ensure_partition(&self.profiles_root, &record.id).await?;
        let view_config = ViewSurfaceConfig::for_account(record.id.clone(), None);
        let handle = self.spawner.spawn(&record.id, &view_config, &applied_proxy).await?;

        let mut status = self.status.write().await;
        status.state = InstanceState::Starting;
        status.pid = handle.pid();
        status.started_at = Some(Utc::now());
        status.last_heartbeat = Some(Utc::now());
        let snapshot = status.clone();
        drop(status);

        self.handle = Some(handle);
        self.bus.notify(Notification::InstanceStatusChanged { account_id: self.account_id.clone(), status: snapshot });
        self.inject_and_mark_running().await;
        Ok(())
    }

    /// Request a graceful close and, regardless of whether it had any
    /// effect, fall through to a forced terminate — `timeout_after` exists
    /// in the signature for a `WorkerHandle` whose `request_close` is not a
    /// no-op and needs a grace window before `force_terminate` runs.
    async fn destroy_worker(&mut self, _timeout_after: Duration) {
        if let Some(mut handle) = self.handle.take() {
            let _ = handle.request_close().await;
            let _ = handle.force_terminate().await;
        }
        let mut status = self.status.write().await;
        status.state = InstanceState::Stopped;
        status.pid = None;
        let snapshot = status.clone();
        drop(status);
        self.bus.notify(Notification::InstanceStatusChanged { account_id: self.account_id.clone(), status: snapshot });
        info!(account_id = %self.account_id, "supervisor: instance stopped");
    }

    async fn update_proxy(&mut self, proxy: ProxySettings) -> Result<()> {
        match corewatch_isolation::apply_proxy(&proxy) {
            Ok(_) => {
                let mut record = self.record.write().await;
                record.proxy = proxy;
                Ok(())
            }
            Err(error) => {
                let proxy_error = CoreError::ProxyFailure { account_id: self.account_id.clone(), message: error.to_string() };
                self.bus.publish_error(EventSource::Supervisor, &proxy_error).await;
                let mut status = self.status.write().await;
                status.state = InstanceState::Error;
                status.last_error = Some(proxy_error.to_string());
                Err(proxy_error)
            }
        }
    }

    async fn reload(&mut self, ignore_cache: bool) -> Result<()> {
        let Some(handle) = self.handle.as_mut() else {
            return Err(CoreError::NotFound { id: self.account_id.to_string() });
        };
        handle.reload(ignore_cache).await
    }

    async fn load_url(&mut self, url: String) -> Result<()> {
        let Some(handle) = self.handle.as_mut() else {
            return Err(CoreError::NotFound { id: self.account_id.to_string() });
        };
        handle.load_url(&url).await
    }

    async fn probe_health(&mut self) {
        let Some(handle) = self.handle.as_mut() else { return };
        match handle.probe_liveness(self.config.liveness_probe_timeout).await {
            Ok(()) => {
                if let Ok((memory_bytes, cpu_percent)) = handle.sample_resources().await {
                    let mut status = self.status.write().await;
                    status.memory_bytes = Some(memory_bytes);
                    status.cpu_percent = Some(cpu_percent);
                    status.last_heartbeat = Some(Utc::now());
                }
            }
            Err(_) => {
                let error = CoreError::Unresponsive { account_id: self.account_id.clone() };
                self.bus.publish_error(EventSource::Supervisor, &error).await;
                self.bus.notify(Notification::AccountError {
                    account_id: self.account_id.clone(),
                    category: error.category().to_string(),
                    message: error.to_string(),
                });
                // don't restart automatically on a hang.
            }
        }
    }
}
