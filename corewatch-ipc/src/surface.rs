//! `IpcSurface`: one async method per request-response channel, wiring
//! together the Configuration Store, Instance Supervisor, View
//! Switching Engine and Migration Engine the router dispatches onto.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast;

use corewatch_config::ConfigStore;
use corewatch_isolation::{partition, LoginSignal};
use corewatch_migration::MigrationEngine;
use corewatch_monitor::{EventBus, Notification};
use corewatch_supervisor::InstanceSupervisor;
use corewatch_switch::SwitchEngine;
use corewatch_types::{AccountDraft, AccountId, AccountPatch, AccountRecord, CoreError, InstanceStatus, ProxySettings, Result};

use crate::types::{AccountRecordWithStatus, MigrationStatusResponse, SessionDetectLoginResponse, SessionStatsResponse};

pub struct IpcSurface {
    config_store: Arc<dyn ConfigStore>,
    supervisor: Arc<InstanceSupervisor>,
    switch_engine: Arc<SwitchEngine>,
    migration_engine: Arc<MigrationEngine>,
    profiles_root: PathBuf,
    bus: Arc<EventBus>,
}

impl IpcSurface {
    pub fn new(
        config_store: Arc<dyn ConfigStore>,
        supervisor: Arc<InstanceSupervisor>,
        switch_engine: Arc<SwitchEngine>,
        migration_engine: Arc<MigrationEngine>,
        profiles_root: impl Into<PathBuf>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self { config_store, supervisor, switch_engine, migration_engine, profiles_root: profiles_root.into(), bus }
    }

    /// Shell-facing notification stream. The router relays these;
    /// `IpcSurface` only exposes the subscription point.
    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.bus.subscribe_notifications()
    }

    async fn status_for(&self, id: &AccountId) -> InstanceStatus {
        self.supervisor.get_status(id).await.unwrap_or_else(|_| InstanceStatus::stopped(id.clone()))
    }

    async fn with_status(&self, record: AccountRecord) -> AccountRecordWithStatus {
        let status = self.status_for(&record.id).await;
        AccountRecordWithStatus { record, status }
    }

    async fn get_record(&self, id: &AccountId) -> Result<AccountRecord> {
        self.config_store.get(id).await?.ok_or_else(|| CoreError::NotFound { id: id.to_string() })
    }

    // -- account.* ---------------------------------------------------

    pub async fn account_list(&self) -> Result<Vec<AccountRecordWithStatus>> {
        let records = self.config_store.load_all().await?;
        let mut out = Vec::with_capacity(records.len());
        for record in records {
            out.push(self.with_status(record).await);
        }
        Ok(out)
    }

    pub async fn account_get(&self, id: &AccountId) -> Result<AccountRecordWithStatus> {
        let record = self.get_record(id).await?;
        Ok(self.with_status(record).await)
    }

    pub async fn account_create(&self, draft: AccountDraft) -> Result<AccountRecord> {
        let record = self.config_store.create(draft).await?;
        self.bus.notify(Notification::AccountsUpdated);
        Ok(record)
    }

    pub async fn account_update(&self, id: &AccountId, patch: AccountPatch) -> Result<AccountRecord> {
        let record = self.config_store.update(id, patch).await?;
        self.bus.notify(Notification::AccountsUpdated);
        Ok(record)
    }

    pub async fn account_delete(&self, id: &AccountId, retain_storage: bool) -> Result<()> {
        // Instance may or may not be running; stopping is best-effort so a
        // never-started account can still be deleted.
        let _ = self.supervisor.destroy(id).await;
        self.switch_engine.destroy_view(id).await;
        self.config_store.delete(id, retain_storage).await?;
        self.bus.notify(Notification::AccountsUpdated);
        Ok(())
    }

    pub async fn account_reorder(&self, id_sequence: Vec<AccountId>) -> Result<()> {
        self.config_store.reorder(id_sequence).await?;
        self.bus.notify(Notification::AccountsUpdated);
        Ok(())
    }

    // -- instance.* ---------------------------------------------------

    pub async fn instance_start(&self, id: &AccountId) -> Result<InstanceStatus> {
        let record = self.get_record(id).await?;
        match self.supervisor.get_status(id).await {
            Ok(status) if status.state != corewatch_types::InstanceState::Stopped => return Ok(status),
            _ => {}
        }
        self.supervisor.create(record).await?;
        self.supervisor.get_status(id).await
    }

    pub async fn instance_stop(&self, id: &AccountId) -> Result<()> {
        self.switch_engine.destroy_view(id).await;
        self.supervisor.destroy(id).await
    }

    pub async fn instance_restart(&self, id: &AccountId) -> Result<InstanceStatus> {
        self.supervisor.restart(id).await?;
        self.supervisor.get_status(id).await
    }

    pub async fn instance_update_proxy(&self, id: &AccountId, proxy: ProxySettings) -> Result<()> {
        self.supervisor.update_proxy(id, proxy).await
    }

    pub async fn instance_status(&self, id: &AccountId) -> Result<InstanceStatus> {
        self.supervisor.get_status(id).await
    }

    pub async fn instance_health(&self, id: &AccountId) -> Result<InstanceStatus> {
        self.supervisor.health_check(id).await
    }

    pub async fn instance_health_all(&self) -> Vec<InstanceStatus> {
        self.supervisor.health_check_all().await
    }

    // -- view.* ---------------------------------------------------

    pub async fn view_switch_to(&self, id: &AccountId) -> Result<()> {
        let record = self.get_record(id).await?;
        self.switch_engine.switch_to(&record).await
    }

    pub async fn view_switch_to_index(&self, index: usize) -> Result<()> {
        let records = self.config_store.load_all().await?;
        let record = records
            .into_iter()
            .nth(index)
            .ok_or_else(|| CoreError::NotFound { id: format!("index {index}") })?;
        self.switch_engine.switch_to(&record).await
    }

    pub async fn view_next(&self) -> Result<()> {
        self.step(1).await
    }

    pub async fn view_previous(&self) -> Result<()> {
        self.step(-1).await
    }

    /// Shared `next`/`previous` stepping logic: move one position within
    /// the order-sorted list, wrapping around both ends.
    async fn step(&self, direction: i64) -> Result<()> {
        let records = self.config_store.load_all().await?;
        if records.is_empty() {
            return Ok(());
        }
        let active = self.switch_engine.active_id().await;
        let current_index = active.and_then(|id| records.iter().position(|r| r.id == id));
        let len = records.len() as i64;
        let next_index = match current_index {
            Some(index) => ((index as i64 + direction).rem_euclid(len)) as usize,
            None => 0,
        };
        self.switch_engine.switch_to(&records[next_index]).await
    }

    pub async fn view_active(&self) -> Option<AccountId> {
        self.switch_engine.active_id().await
    }

    pub async fn view_reload(&self, id: &AccountId, ignore_cache: bool) -> Result<()> {
        self.supervisor.reload(id, ignore_cache).await
    }

    pub async fn view_load_url(&self, id: &AccountId, url: String) -> Result<()> {
        self.supervisor.load_url(id, url).await
    }

    // -- session.* ---------------------------------------------------

    fn partition_path(&self, id: &AccountId) -> PathBuf {
        self.profiles_root.join(corewatch_types::paths::partition_dir_name(id))
    }

    pub async fn session_has_data(&self, id: &AccountId) -> bool {
        partition::has_session_data(&self.partition_path(id))
    }

    pub async fn session_clear(&self, id: &AccountId) -> Result<()> {
        let path = self.partition_path(id);
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(CoreError::StoreCorrupt { message: format!("clear session partition: {err}") }),
        }
        partition::ensure_partition(&self.profiles_root, id).await?;
        Ok(())
    }

    pub async fn session_stats(&self, id: &AccountId) -> Result<SessionStatsResponse> {
        let stats = partition::partition_stats(&self.partition_path(id)).await?;
        Ok(stats.into())
    }

    /// Partition data appearing is treated as `CookiesAppeared`; with none
    /// yet, status stays `Unknown`.
    pub async fn session_detect_login(&self, id: &AccountId) -> SessionDetectLoginResponse {
        let has_data = self.session_has_data(id).await;
        let status = if has_data {
            corewatch_isolation::infer_login_status(corewatch_types::LoginStatus::Unknown, LoginSignal::CookiesAppeared)
        } else {
            corewatch_types::LoginStatus::Unknown
        };
        SessionDetectLoginResponse { status }
    }

    // -- migration.* ---------------------------------------------------

    pub async fn migration_status(&self) -> MigrationStatusResponse {
        let completed = tokio::fs::metadata(self.migration_engine.sentinel_path()).await.is_ok();
        MigrationStatusResponse { completed }
    }

    pub async fn migration_execute(&self) -> Result<corewatch_migration::MigrationOutcome> {
        self.migration_engine.run().await
    }
}
