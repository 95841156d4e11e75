//! The top-level application object: wires the Configuration Store,
//! Migration Engine, Instance Supervisor, View Switching Engine and IPC
//! Surface together behind one start/stop lifecycle, replacing the
//! module-level singletons the source used.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use tracing::{info, warn};

use corewatch_config::{ConfigStore, JsonFileConfigStore};
use corewatch_ipc::IpcSurface;
use corewatch_migration::MigrationEngine;
use corewatch_monitor::{ErrorLog, EventBus};
use corewatch_supervisor::{InstanceSupervisor, ProcessWorkerSpawner};
use corewatch_switch::SwitchEngine;
use corewatch_types::{AccountId, CoreError, Result};

use crate::config::ApplicationConfig;

const ERROR_LOG_FILE_NAME: &str = "errors.log";
const REGISTRY_FILE_NAME: &str = "registry.json";
const PARTITIONS_DIR_NAME: &str = "profiles";

pub struct Application {
    bind_addr: SocketAddr,
    data_dir: PathBuf,
    bus: Arc<EventBus>,
    config_store: Arc<dyn ConfigStore>,
    supervisor: Arc<InstanceSupervisor>,
    switch_engine: Arc<SwitchEngine>,
    migration_engine: Arc<MigrationEngine>,
    surface: Arc<IpcSurface>,
    health_tick: tokio::task::JoinHandle<()>,
}

impl Application {
    /// Stand up every component, run the one-shot migration if needed, and
    /// auto-start every account marked `auto_start`. Returns once that
    /// startup work has been kicked off — created instances still follow
    /// the Supervisor's own "returns before content has loaded" contract.
    pub async fn start(config: ApplicationConfig) -> Result<Self> {
        tokio::fs::create_dir_all(&config.data_dir)
            .await
            .map_err(|error| CoreError::StoreCorrupt { message: format!("could not create data directory: {error}") })?;

        let registry_path = config.data_dir.join(REGISTRY_FILE_NAME);
        let profiles_root = config.data_dir.join(PARTITIONS_DIR_NAME);
        let bus = Arc::new(EventBus::new(ErrorLog::new(config.data_dir.join(ERROR_LOG_FILE_NAME))));

        let migration_engine = Arc::new(MigrationEngine::new(&config.data_dir, &registry_path, bus.clone()));
        match migration_engine.run().await {
            Ok(outcome) if outcome.ran => {
                info!(migrated = outcome.migrated_count, warnings = outcome.warnings.len(), "migration completed");
            }
            Ok(_) => {}
            Err(error) => {
                // The migration engine has already published this to the
                // event bus and error log; the application still starts
                // against whatever registry already exists.
                warn!(error = %error, "migration did not complete, continuing with the pre-migration registry");
            }
        }

        let config_store: Arc<dyn ConfigStore> =
            Arc::new(JsonFileConfigStore::new(registry_path, &profiles_root, bus.clone()));

        let spawner = Arc::new(ProcessWorkerSpawner::new(config.worker_program.clone(), config.worker_args.clone()));
        let supervisor = Arc::new(InstanceSupervisor::new(config.supervisor.clone(), spawner, &profiles_root, bus.clone()));
        let health_tick = supervisor.spawn_health_tick();

        let switch_engine = Arc::new(SwitchEngine::new(supervisor.clone(), bus.clone()));
        let surface = Arc::new(IpcSurface::new(
            config_store.clone(),
            supervisor.clone(),
            switch_engine.clone(),
            migration_engine.clone(),
            &profiles_root,
            bus.clone(),
        ));

        let application = Self {
            bind_addr: config.bind_addr,
            data_dir: config.data_dir,
            bus,
            config_store,
            supervisor,
            switch_engine,
            migration_engine,
            surface,
            health_tick,
        };
        application.auto_start_accounts().await;
        Ok(application)
    }

    async fn auto_start_accounts(&self) {
        let records = match self.config_store.load_all().await {
            Ok(records) => records,
            Err(error) => {
                warn!(error = %error, "could not load the registry to auto-start accounts");
                return;
            }
        };
        for record in records.into_iter().filter(|record| record.auto_start) {
            let account_id = record.id.clone();
            if let Err(error) = self.supervisor.create(record).await {
                warn!(account_id = %account_id, error = %error, "auto-start failed");
            }
        }
    }

    /// The IPC router the shell talks to — normally handed straight to
    /// `axum::serve`.
    pub fn router(&self) -> Router {
        corewatch_ipc::build_router(self.surface.clone())
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn config_store(&self) -> &Arc<dyn ConfigStore> {
        &self.config_store
    }

    pub fn supervisor(&self) -> &Arc<InstanceSupervisor> {
        &self.supervisor
    }

    pub fn switch_engine(&self) -> &Arc<SwitchEngine> {
        &self.switch_engine
    }

    pub fn migration_engine(&self) -> &Arc<MigrationEngine> {
        &self.migration_engine
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Graceful shutdown: stop the health-tick loop and destroy every
    /// registered instance.
    pub async fn shutdown(self) {
        self.health_tick.abort();
        let running: Vec<AccountId> = self.supervisor.list_running().await.into_iter().map(|status| status.account_id).collect();
        for account_id in running {
            if let Err(error) = self.supervisor.destroy(&account_id).await {
                warn!(account_id = %account_id, error = %error, "failed to stop instance during shutdown");
            }
        }
        info!("application shut down");
    }
}
