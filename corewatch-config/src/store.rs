use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use corewatch_monitor::{EventBus, EventSource};
use corewatch_types::{
    validation, AccountDraft, AccountId, AccountPatch, AccountRecord, CoreError, GlobalState, RegistryDocument,
    Result, SIDEBAR_WIDTH_DEFAULT,
};

use crate::defaults::record_from_draft;

/// The Configuration Store's operation contract. Async,
/// serialized per-store, atomic on every mutation.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Records sorted by `order`. `StoreCorrupt` callers may
    /// fall back to an empty registry.
    async fn load_all(&self) -> Result<Vec<AccountRecord>>;
    async fn get(&self, id: &AccountId) -> Result<Option<AccountRecord>>;
    async fn create(&self, draft: AccountDraft) -> Result<AccountRecord>;
    async fn update(&self, id: &AccountId, patch: AccountPatch) -> Result<AccountRecord>;
    async fn delete(&self, id: &AccountId, retain_storage: bool) -> Result<()>;
    async fn reorder(&self, id_sequence: Vec<AccountId>) -> Result<()>;
    async fn global_state(&self) -> Result<GlobalState>;
    async fn set_active_account(&self, id: Option<AccountId>) -> Result<()>;
    async fn set_sidebar_width(&self, width: u32) -> Result<()>;
}

/// JSON-file-backed [`ConfigStore`]. A single [`Mutex`] around the whole
/// read-modify-write cycle is the store's write guard; readers that only
/// call `load_all`/`get` still take the guard so they never observe a
/// torn write.
pub struct JsonFileConfigStore {
    registry_path: PathBuf,
    /// Root directory under which per-account partition directories live;
    /// `delete(id, retain_storage: false)` recursively removes
    /// `partitions_root/account_{id}` from here, since the on-disk
    /// registry and the partition directories are deleted together as one
    /// user-visible "delete this account" operation.
    partitions_root: PathBuf,
    guard: Mutex<()>,
    global: Mutex<GlobalState>,
    bus: Arc<EventBus>,
}

impl JsonFileConfigStore {
    pub fn new(registry_path: impl Into<PathBuf>, partitions_root: impl Into<PathBuf>, bus: Arc<EventBus>) -> Self {
        Self {
            registry_path: registry_path.into(),
            partitions_root: partitions_root.into(),
            guard: Mutex::new(()),
            global: Mutex::new(GlobalState { sidebar_width: SIDEBAR_WIDTH_DEFAULT, ..Default::default() }),
            bus,
        }
    }

    pub fn registry_path(&self) -> &Path {
        &self.registry_path
    }

    pub fn partition_path(&self, id: &AccountId) -> PathBuf {
        self.partitions_root.join(corewatch_types::paths::partition_dir_name(id))
    }

    /// Read the current document, falling back to an empty registry on a
    /// corrupt or absent file. Must be called with `guard` held.
    async fn read_document(&self) -> RegistryDocument {
        match fs::read(&self.registry_path).await {
            Ok(bytes) => match serde_json::from_slice::<RegistryDocument>(&bytes) {
                Ok(doc) => doc,
                Err(err) => {
                    let error = CoreError::StoreCorrupt { message: err.to_string() };
                    warn!(error = %error, "registry file is not valid JSON; falling back to an empty registry");
                    self.bus.publish_error(EventSource::ConfigStore, &error).await;
                    RegistryDocument::empty()
                }
            },
            Err(_) => RegistryDocument::empty(),
        }
    }

    /// Write-temp-then-rename. Must be called with `guard` held.
    async fn write_document(&self, doc: &RegistryDocument) -> Result<()> {
        if let Some(parent) = self.registry_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::StoreCorrupt { message: format!("create registry dir: {e}") })?;
        }
        let tmp_path = self.registry_path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(doc)
            .map_err(|e| CoreError::StoreCorrupt { message: format!("serialize registry: {e}") })?;
        fs::write(&tmp_path, &bytes)
            .await
            .map_err(|e| CoreError::StoreCorrupt { message: format!("write registry temp file: {e}") })?;
        fs::rename(&tmp_path, &self.registry_path)
            .await
            .map_err(|e| CoreError::StoreCorrupt { message: format!("rename registry temp file: {e}") })?;
        Ok(())
    }
}

#[async_trait]
impl ConfigStore for JsonFileConfigStore {
    async fn load_all(&self) -> Result<Vec<AccountRecord>> {
        let _permit = self.guard.lock().await;
        Ok(self.read_document().await.sorted_by_order())
    }

    async fn get(&self, id: &AccountId) -> Result<Option<AccountRecord>> {
        let _permit = self.guard.lock().await;
        Ok(self.read_document().await.accounts.get(id).cloned())
    }

    async fn create(&self, draft: AccountDraft) -> Result<AccountRecord> {
        debug!(name = %draft.name, "config store: create");
        let _permit = self.guard.lock().await;
        let mut doc = self.read_document().await;

        let id = AccountId::generate();
        let order = doc.next_order();
        let now = Utc::now();
        let record = record_from_draft(id.clone(), order, draft, now);

        let errors = validation::validate_record(&record);
        if !errors.is_empty() {
            warn!(?errors, "config store: create rejected, validation failed");
            return Err(CoreError::ValidationError { errors });
        }

        doc.accounts.insert(id.clone(), record.clone());
        self.write_document(&doc).await?;
        info!(account_id = %id, order, "config store: account created");
        Ok(record)
    }

    async fn update(&self, id: &AccountId, patch: AccountPatch) -> Result<AccountRecord> {
        debug!(account_id = %id, "config store: update");
        let _permit = self.guard.lock().await;
        let mut doc = self.read_document().await;

        let mut record = doc
            .accounts
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound { id: id.to_string() })?;
        record.apply_patch(patch, Utc::now());

        let errors = validation::validate_record(&record);
        if !errors.is_empty() {
            warn!(account_id = %id, ?errors, "config store: update rejected, validation failed");
            return Err(CoreError::ValidationError { errors });
        }

        doc.accounts.insert(id.clone(), record.clone());
        self.write_document(&doc).await?;
        info!(account_id = %id, "config store: account updated");
        Ok(record)
    }

    async fn delete(&self, id: &AccountId, retain_storage: bool) -> Result<()> {
        debug!(account_id = %id, retain_storage, "config store: delete");
        let _permit = self.guard.lock().await;
        let mut doc = self.read_document().await;

        if doc.accounts.remove(id).is_none() {
            return Err(CoreError::NotFound { id: id.to_string() });
        }
        self.write_document(&doc).await?;

        if !retain_storage {
            let partition = self.partition_path(id);
            if let Err(err) = fs::remove_dir_all(&partition).await {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!(account_id = %id, error = %err, "config store: failed to remove partition directory");
                }
            }
        }
        info!(account_id = %id, "config store: account deleted");
        Ok(())
    }

    async fn reorder(&self, id_sequence: Vec<AccountId>) -> Result<()> {
        debug!(count = id_sequence.len(), "config store: reorder");
        let _permit = self.guard.lock().await;
        let mut doc = self.read_document().await;

        if !doc.is_permutation_of_ids(&id_sequence) {
            let errors = vec!["idSequence must be a permutation of existing account ids".to_string()];
            warn!(?errors, "config store: reorder rejected");
            return Err(CoreError::ValidationError { errors });
        }

        for (order, id) in id_sequence.into_iter().enumerate() {
            if let Some(record) = doc.accounts.get_mut(&id) {
                record.order = order as u32;
            }
        }
        self.write_document(&doc).await?;
        info!("config store: reorder committed");
        Ok(())
    }

    async fn global_state(&self) -> Result<GlobalState> {
        Ok(self.global.lock().await.clone())
    }

    async fn set_active_account(&self, id: Option<AccountId>) -> Result<()> {
        let mut global = self.global.lock().await;
        global.active_account_id = id;
        Ok(())
    }

    async fn set_sidebar_width(&self, width: u32) -> Result<()> {
        let clamped = width.clamp(corewatch_types::SIDEBAR_WIDTH_MIN, corewatch_types::SIDEBAR_WIDTH_MAX);
        let mut global = self.global.lock().await;
        global.sidebar_width = clamped;
        Ok(())
    }
}
