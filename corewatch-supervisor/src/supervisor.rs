//! The `InstanceSupervisor`: the operation surface the rest of
//! the system drives — `create`, `destroy`, `restart`, `update_proxy`,
//! `get_status`, `list_running`, `instance_count` — backed by one
//! [`actor::InstanceActor`] task per live or crashed account.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::time::{interval, sleep};
use tracing::{info, warn};

use corewatch_isolation::{self, ContentScriptInjector, NoopInjector, ViewSurfaceConfig};
use corewatch_monitor::{EventBus, EventSource, Notification};
use corewatch_types::{AccountId, AccountRecord, CoreError, InstanceState, InstanceStatus, ProxySettings, Result};

use crate::actor::{InstanceActor, InstanceCommand, InstanceRef};
use crate::crash::{
    CrashWindow, DEFAULT_CRASH_WINDOW, DEFAULT_HANG_TIMEOUT, DEFAULT_HEALTH_TICK_INTERVAL, DEFAULT_LIVENESS_PROBE_TIMEOUT,
    DEFAULT_MAX_CRASH_COUNT, DEFAULT_RESTART_COOLDOWN, DEFAULT_RESTART_DELAY,
};
use crate::resource::{ResourceMonitor, ResourceState};
use crate::worker::WorkerSpawner;
use crate::{DEFAULT_DESTROY_TIMEOUT, DEFAULT_MAX_INSTANCES, DEFAULT_RESOURCE_LIMIT_PCT, DEFAULT_RESOURCE_WARNING_PCT};

/// Tunables for one [`InstanceSupervisor`]. All default to the values spec
/// §4.3 names; construct with [`SupervisorConfig::default`] and override
/// selectively.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub max_instances: usize,
    pub max_crash_count: u32,
    pub crash_window: Duration,
    pub restart_delay: Duration,
    pub restart_cooldown: Duration,
    pub hang_timeout: Duration,
    pub health_tick_interval: Duration,
    pub liveness_probe_timeout: Duration,
    pub destroy_timeout: Duration,
    pub resource_warning_pct: f32,
    pub resource_limit_pct: f32,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_instances: DEFAULT_MAX_INSTANCES,
            max_crash_count: DEFAULT_MAX_CRASH_COUNT,
            crash_window: DEFAULT_CRASH_WINDOW,
            restart_delay: DEFAULT_RESTART_DELAY,
            restart_cooldown: DEFAULT_RESTART_COOLDOWN,
            hang_timeout: DEFAULT_HANG_TIMEOUT,
            health_tick_interval: DEFAULT_HEALTH_TICK_INTERVAL,
            liveness_probe_timeout: DEFAULT_LIVENESS_PROBE_TIMEOUT,
            destroy_timeout: DEFAULT_DESTROY_TIMEOUT,
            resource_warning_pct: DEFAULT_RESOURCE_WARNING_PCT,
            resource_limit_pct: DEFAULT_RESOURCE_LIMIT_PCT,
        }
    }
}

const COMMAND_CHANNEL_CAPACITY: usize = 32;

/// Owns every running (or crashed-but-still-registered) account instance.
/// Operations on a single account id are serialized by that account's
/// actor mailbox; operations across different ids proceed independently.
pub struct InstanceSupervisor {
    config: Arc<SupervisorConfig>,
    spawner: Arc<dyn WorkerSpawner>,
    injector: Arc<dyn ContentScriptInjector>,
    profiles_root: PathBuf,
    bus: Arc<EventBus>,
    instances: RwLock<HashMap<AccountId, InstanceRef>>,
    resource_monitor: ResourceMonitor,
}

impl InstanceSupervisor {
    pub fn new(config: SupervisorConfig, spawner: Arc<dyn WorkerSpawner>, profiles_root: impl Into<PathBuf>, bus: Arc<EventBus>) -> Self {
        let resource_monitor = ResourceMonitor::new(config.resource_warning_pct, config.resource_limit_pct);
        Self {
            config: Arc::new(config),
            spawner,
            injector: Arc::new(NoopInjector),
            profiles_root: profiles_root.into(),
            bus,
            instances: RwLock::new(HashMap::new()),
            resource_monitor,
        }
    }

    /// Wire in a real content-script injector; defaults to
    /// [`NoopInjector`] otherwise.
    pub fn with_injector(mut self, injector: Arc<dyn ContentScriptInjector>) -> Self {
        self.injector = injector;
        self
    }

    /// Stand up an isolated execution environment for `record` and start
    /// supervising it. Returns once the worker process has been spawned —
    /// before its content has finished loading.
    pub async fn create(&self, record: AccountRecord) -> Result<()> {
        {
            let instances = self.instances.read().await;
            if instances.contains_key(&record.id) {
                return Err(CoreError::DuplicateId { id: record.id.to_string() });
            }
            let running = instances.len();
            let (_, state) = self.resource_monitor.sample(running, self.config.max_instances);
            if running >= self.config.max_instances || state == ResourceState::AtLimit {
                let error = CoreError::Capacity { max_instances: self.config.max_instances };
                self.bus.publish_error(EventSource::Supervisor, &error).await;
                return Err(error);
            }
            if state == ResourceState::Warning {
                self.bus.notify(Notification::GlobalError {
                    category: "ResourceWarning".to_string(),
                    message: format!("{running}/{} instances running", self.config.max_instances),
                });
            }
        }

        let applied_proxy = match corewatch_isolation::apply_proxy(&record.proxy) {
            Ok(applied) => applied,
            Err(error) => {
                self.bus.publish_error(EventSource::Supervisor, &error).await;
                return Err(error);
            }
        };
        corewatch_isolation::partition::ensure_partition(&self.profiles_root, &record.id).await?;
        let view_config = ViewSurfaceConfig::for_account(record.id.clone(), None);

        let handle = match self.spawner.spawn(&record.id, &view_config, &applied_proxy).await {
            Ok(handle) => handle,
            Err(error) => {
                self.bus.publish_error(EventSource::Supervisor, &error).await;
                return Err(error);
            }
        };

        let account_id = record.id.clone();
        let status = Arc::new(RwLock::new(InstanceStatus {
            pid: handle.pid(),
            state: InstanceState::Starting,
            started_at: Some(Utc::now()),
            last_heartbeat: Some(Utc::now()),
            ..InstanceStatus::stopped(account_id.clone())
        }));
        let record_cell = Arc::new(RwLock::new(record));
        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

        let actor = InstanceActor {
            account_id: account_id.clone(),
            record: record_cell.clone(),
            handle: Some(handle),
            status: status.clone(),
            crash_window: CrashWindow::new(self.config.crash_window),
            config: self.config.clone(),
            spawner: self.spawner.clone(),
            injector: self.injector.clone(),
            profiles_root: self.profiles_root.clone(),
            bus: self.bus.clone(),
            commands: rx,
        };
        let join = tokio::spawn(actor.run());

        self.bus.notify(Notification::InstanceStatusChanged { account_id: account_id.clone(), status: status.read().await.clone() });
        self.instances
            .write()
            .await
            .insert(account_id.clone(), InstanceRef { commands: tx, status, record: record_cell, join });
        info!(account_id = %account_id, "supervisor: instance created");
        Ok(())
    }

    /// Tear down an instance. `retain_partition` is purely advisory at this
    /// layer (the Configuration Store owns partition deletion); the
    /// Supervisor only stops supervising.
    pub async fn destroy(&self, id: &AccountId) -> Result<()> {
        let instance = {
            let mut instances = self.instances.write().await;
            instances.remove(id)
        }
        .ok_or_else(|| CoreError::NotFound { id: id.to_string() })?;

        let (reply_tx, reply_rx) = oneshot::channel();
        if instance
            .commands
            .send(InstanceCommand::Destroy { timeout_after: self.config.destroy_timeout, reply: reply_tx })
            .await
            .is_ok()
        {
            let _ = reply_rx.await;
        }
        let _ = instance.join.await;
        info!(account_id = %id, "supervisor: instance destroyed");
        Ok(())
    }

    /// Explicit, user-initiated restart: capture the current configuration,
    /// destroy, wait the restart cooldown, then create anew.
    pub async fn restart(&self, id: &AccountId) -> Result<()> {
        let record = {
            let instances = self.instances.read().await;
            let instance = instances.get(id).ok_or_else(|| CoreError::NotFound { id: id.to_string() })?;
            instance.record.read().await.clone()
        };
        self.destroy(id).await?;
        sleep(self.config.restart_cooldown).await;
        self.create(record).await
    }

    /// If the account is crashed (auto-restart budget exhausted) but still
    /// registered, reset its crash window and respawn in place rather than
    /// going through a full destroy/create. If it's not currently crashed,
    /// falls back to [`Self::restart`].
    pub async fn reset_and_restart(&self, id: &AccountId) -> Result<()> {
        let is_crashed = {
            let instances = self.instances.read().await;
            match instances.get(id) {
                Some(instance) => instance.status.read().await.state == InstanceState::Crashed,
                None => return Err(CoreError::NotFound { id: id.to_string() }),
            }
        };
        if !is_crashed {
            return self.restart(id).await;
        }

        let instances = self.instances.read().await;
        let instance = instances.get(id).ok_or_else(|| CoreError::NotFound { id: id.to_string() })?;
        let (tx, rx) = oneshot::channel();
        instance
            .commands
            .send(InstanceCommand::ResetCrashWindow { reply: tx })
            .await
            .map_err(|_| CoreError::RestartFailure { account_id: id.clone(), message: "instance actor is gone".to_string() })?;
        let _ = rx.await;
        Ok(())
    }

    /// Apply new proxy settings to a running instance without recreating
    /// its view.
    pub async fn update_proxy(&self, id: &AccountId, proxy: ProxySettings) -> Result<()> {
        let instances = self.instances.read().await;
        let instance = instances.get(id).ok_or_else(|| CoreError::NotFound { id: id.to_string() })?;
        let (tx, rx) = oneshot::channel();
        instance
            .commands
            .send(InstanceCommand::UpdateProxy { proxy, reply: tx })
            .await
            .map_err(|_| CoreError::ProxyFailure { account_id: id.clone(), message: "instance actor is gone".to_string() })?;
        rx.await
            .map_err(|_| CoreError::ProxyFailure { account_id: id.clone(), message: "instance actor dropped the reply".to_string() })?
    }

    /// Reload the view's current page.
    pub async fn reload(&self, id: &AccountId, ignore_cache: bool) -> Result<()> {
        let instances = self.instances.read().await;
        let instance = instances.get(id).ok_or_else(|| CoreError::NotFound { id: id.to_string() })?;
        let (tx, rx) = oneshot::channel();
        instance
            .commands
            .send(InstanceCommand::Reload { ignore_cache, reply: tx })
            .await
            .map_err(|_| CoreError::PageLoadFailure { account_id: id.clone(), code: None, message: "instance actor is gone".to_string() })?;
        rx.await.map_err(|_| CoreError::PageLoadFailure {
            account_id: id.clone(),
            code: None,
            message: "instance actor dropped the reply".to_string(),
        })?
    }

    /// Navigate the view to `url`.
    pub async fn load_url(&self, id: &AccountId, url: String) -> Result<()> {
        let instances = self.instances.read().await;
        let instance = instances.get(id).ok_or_else(|| CoreError::NotFound { id: id.to_string() })?;
        let (tx, rx) = oneshot::channel();
        instance
            .commands
            .send(InstanceCommand::LoadUrl { url, reply: tx })
            .await
            .map_err(|_| CoreError::PageLoadFailure { account_id: id.clone(), code: None, message: "instance actor is gone".to_string() })?;
        rx.await.map_err(|_| CoreError::PageLoadFailure {
            account_id: id.clone(),
            code: None,
            message: "instance actor dropped the reply".to_string(),
        })?
    }

    pub async fn get_status(&self, id: &AccountId) -> Result<InstanceStatus> {
        let instances = self.instances.read().await;
        let instance = instances.get(id).ok_or_else(|| CoreError::NotFound { id: id.to_string() })?;
        Ok(instance.status.read().await.clone())
    }

    pub async fn list_running(&self) -> Vec<InstanceStatus> {
        let instances = self.instances.read().await;
        let mut statuses = Vec::with_capacity(instances.len());
        for instance in instances.values() {
            statuses.push(instance.status.read().await.clone());
        }
        statuses
    }

    pub async fn instance_count(&self) -> usize {
        self.instances.read().await.len()
    }

    /// Spawn the background health-tick loop. Returns the task handle so the caller
    /// can decide the shutdown story; dropping it does not stop the loop —
    /// abort it explicitly.
    pub fn spawn_health_tick(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let supervisor = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(supervisor.config.health_tick_interval);
            loop {
                ticker.tick().await;
                supervisor.run_health_tick().await;
            }
        })
    }

    async fn run_health_tick(&self) {
        let senders: Vec<(AccountId, mpsc::Sender<InstanceCommand>)> = {
            let instances = self.instances.read().await;
            instances.iter().map(|(id, instance)| (id.clone(), instance.commands.clone())).collect()
        };
        for (account_id, sender) in senders {
            let _ = self.probe_one(&account_id, &sender).await;
        }
    }

    async fn probe_one(&self, account_id: &AccountId, sender: &mpsc::Sender<InstanceCommand>) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        sender
            .send(InstanceCommand::HealthProbe { reply: tx })
            .await
            .map_err(|_| CoreError::Unresponsive { account_id: account_id.clone() })?;
        if tokio::time::timeout(self.config.liveness_probe_timeout, rx).await.is_err() {
            warn!(account_id = %account_id, "supervisor: health probe reply timed out");
        }
        Ok(())
    }

    /// Probe a single instance on demand and return its refreshed status.
    pub async fn health_check(&self, id: &AccountId) -> Result<InstanceStatus> {
        let sender = {
            let instances = self.instances.read().await;
            instances.get(id).ok_or_else(|| CoreError::NotFound { id: id.to_string() })?.commands.clone()
        };
        let _ = self.probe_one(id, &sender).await;
        self.get_status(id).await
    }

    /// Probe every live instance on demand and return their refreshed
    /// statuses.
    pub async fn health_check_all(&self) -> Vec<InstanceStatus> {
        self.run_health_tick().await;
        self.list_running().await
    }
}
