//! The Migration Engine's conversion pipeline: detect, back
//! up, transform, verify, persist, seal — run once per installation,
//! before the Supervisor accepts work.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use corewatch_monitor::{EventBus, EventSource, Notification};
use corewatch_types::registry::schema_version;
use corewatch_types::{AccountId, AccountRecord, CoreError, RegistryDocument, Result};

use crate::legacy::{self, LegacyAccountRecord};

/// Old canonical single-session directory, relative to the app's data
/// root.
pub const LEGACY_SESSION_DIR_NAME: &str = "session";
pub const SENTINEL_FILE_NAME: &str = "migration-completed.json";
pub const BACKUP_DIR_NAME: &str = "migration-backups";
pub const COMPLETION_LOG_NAME: &str = "migration.log";
pub const PARTITIONS_DIR_NAME: &str = "profiles";

/// What a [`MigrationEngine::run`] call actually did.
#[derive(Debug, Clone, Default)]
pub struct MigrationOutcome {
    /// `false` when the sentinel already existed or nothing legacy was
    /// detected — a true no-op, not a failure.
    pub ran: bool,
    pub migrated_count: usize,
    /// Per-record "storage partition has no detectable data" notices.
    pub warnings: Vec<String>,
}

impl MigrationOutcome {
    fn no_op() -> Self {
        Self::default()
    }
}

/// Drives the one-shot legacy-layout upgrade for one installation's data
/// root.
pub struct MigrationEngine {
    data_root: PathBuf,
    registry_path: PathBuf,
    bus: Arc<EventBus>,
}

impl MigrationEngine {
    pub fn new(data_root: impl Into<PathBuf>, registry_path: impl Into<PathBuf>, bus: Arc<EventBus>) -> Self {
        Self { data_root: data_root.into(), registry_path: registry_path.into(), bus }
    }

    pub fn legacy_session_dir(&self) -> PathBuf {
        self.data_root.join(LEGACY_SESSION_DIR_NAME)
    }

    pub fn sentinel_path(&self) -> PathBuf {
        self.data_root.join(SENTINEL_FILE_NAME)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.data_root.join(BACKUP_DIR_NAME)
    }

    pub fn completion_log_path(&self) -> PathBuf {
        self.data_root.join(COMPLETION_LOG_NAME)
    }

    pub fn partitions_root(&self) -> PathBuf {
        self.data_root.join(PARTITIONS_DIR_NAME)
    }

    /// Run the full pipeline if (and only if) it hasn't completed yet.
    /// Idempotent: a second call after a successful run is a cheap no-op.
    pub async fn run(&self) -> Result<MigrationOutcome> {
        if tokio::fs::metadata(self.sentinel_path()).await.is_ok() {
            return Ok(MigrationOutcome::no_op());
        }

        let registry_bytes = tokio::fs::read(&self.registry_path).await.ok();
        let doc_value: Option<Value> = registry_bytes.as_deref().and_then(|bytes| serde_json::from_slice(bytes).ok());
        let legacy_dir_exists = tokio::fs::metadata(self.legacy_session_dir()).await.is_ok();
        let has_geometry = doc_value.as_ref().is_some_and(legacy::has_embedded_geometry);

        if !legacy_dir_exists && !has_geometry {
            return Ok(MigrationOutcome::no_op());
        }
        let (Some(registry_bytes), Some(doc_value)) = (registry_bytes, doc_value) else {
            // A legacy session directory exists but there's no registry
            // file to convert — nothing structured to migrate yet. Leave
            // the sentinel unwritten so a registry that appears later is
            // still picked up.
            return Ok(MigrationOutcome::no_op());
        };

        info!(data_root = %self.data_root.display(), "legacy layout detected, starting migration");
        self.backup(&registry_bytes, &doc_value).await?;

        let (legacy_records, mut errors) = legacy::parse_legacy_accounts(&doc_value);
        let (migrated, mut validation_errors) = transform(legacy_records);
        errors.append(&mut validation_errors);

        if !errors.is_empty() {
            let error = CoreError::MigrationFailure { message: errors.join("; ") };
            warn!(error_count = errors.len(), "migration aborted, registry left untouched");
            self.bus
                .publish_error_with_details(
                    EventSource::Migration,
                    &error,
                    HashMap::from([("recordErrors".to_string(), serde_json::json!(errors))]),
                )
                .await;
            return Err(error);
        }

        let warnings = self.verify(&migrated).await;
        self.persist(migrated.clone()).await?;
        self.seal(migrated.len(), &warnings).await?;
        info!(migrated_count = migrated.len(), warning_count = warnings.len(), "migration sealed");

        Ok(MigrationOutcome { ran: true, migrated_count: migrated.len(), warnings })
    }

    async fn backup(&self, registry_bytes: &[u8], doc_value: &Value) -> Result<()> {
        let dir = self.backup_dir();
        tokio::fs::create_dir_all(&dir).await.map_err(io_err)?;

        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ").to_string();
        let registry_backup = dir.join(format!("registry-{stamp}.json"));
        tokio::fs::write(&registry_backup, registry_bytes).await.map_err(io_err)?;

        let geometry_audit = extract_geometry_audit(doc_value);
        let audit_bytes = serde_json::to_vec_pretty(&geometry_audit).map_err(ser_err)?;
        tokio::fs::write(dir.join(format!("window-geometry-{stamp}.json")), audit_bytes)
            .await
            .map_err(io_err)?;
        Ok(())
    }

    async fn verify(&self, records: &[AccountRecord]) -> Vec<String> {
        let mut warnings = Vec::new();
        for record in records {
            let partition_dir = self.partitions_root().join(corewatch_types::paths::partition_dir_name(&record.id));
            if !corewatch_isolation::partition::has_session_data(&partition_dir) {
                warnings.push(format!("{}: storage partition has no detectable session data", record.id));
            }
        }
        warnings
    }

    async fn persist(&self, records: Vec<AccountRecord>) -> Result<()> {
        let mut accounts = HashMap::new();
        for record in records {
            accounts.insert(record.id.clone(), record);
        }
        let doc = RegistryDocument {
            version: schema_version::POST_MIGRATION.to_string(),
            accounts,
            migrated_at: Some(Utc::now()),
            migrated_from: Some(schema_version::PRE_MIGRATION.to_string()),
        };

        let tmp = self.registry_path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(&doc).map_err(ser_err)?;
        tokio::fs::write(&tmp, &bytes).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.registry_path).await.map_err(io_err)?;
        Ok(())
    }

    async fn seal(&self, migrated_count: usize, warnings: &[String]) -> Result<()> {
        let sentinel = serde_json::json!({
            "version": schema_version::POST_MIGRATION,
            "completedAt": Utc::now().to_rfc3339(),
        });
        let sentinel_bytes = serde_json::to_vec_pretty(&sentinel).map_err(ser_err)?;
        tokio::fs::write(self.sentinel_path(), sentinel_bytes).await.map_err(io_err)?;

        let mut line = format!("[{}] migration complete: {migrated_count} account(s) migrated", Utc::now().to_rfc3339());
        if !warnings.is_empty() {
            line.push_str(&format!("; {} warning(s): {}", warnings.len(), warnings.join(" | ")));
        }
        line.push('\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.completion_log_path())
            .await
            .map_err(io_err)?;
        file.write_all(line.as_bytes()).await.map_err(io_err)?;

        self.bus.notify(Notification::AccountsUpdated);
        Ok(())
    }
}

/// Sort legacy records by prior window `y` then `x` (stable), assign
/// `order` from that sequence, drop the geometry, and default anything
/// missing. Returns the converted records alongside any per-record
/// validation errors (account id prefixed).
fn transform(mut legacy_records: Vec<LegacyAccountRecord>) -> (Vec<AccountRecord>, Vec<String>) {
    legacy_records.sort_by(|a, b| match (a.window, b.window) {
        (Some(a), Some(b)) => (a.y, a.x).cmp(&(b.y, b.x)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    let now = Utc::now();
    let mut records = Vec::with_capacity(legacy_records.len());
    let mut errors = Vec::new();

    for (order, legacy) in legacy_records.into_iter().enumerate() {
        let id: AccountId = legacy.id.clone().into();
        let record = AccountRecord {
            id: id.clone(),
            name: legacy.name,
            note: legacy.note,
            order: order as u32,
            created_at: now,
            last_active_at: now,
            auto_start: false,
            session_dir: legacy.session_dir.unwrap_or_else(|| corewatch_types::paths::partition_dir_name(&id)),
            proxy: legacy.proxy.unwrap_or_default(),
            translation: legacy.translation.unwrap_or_default(),
            notifications: legacy.notifications.unwrap_or_default(),
        };

        let record_errors = corewatch_types::validation::validate_record(&record);
        if !record_errors.is_empty() {
            errors.push(format!("{}: {}", record.id, record_errors.join(", ")));
        }
        records.push(record);
    }
    (records, errors)
}

fn extract_geometry_audit(doc: &Value) -> Vec<Value> {
    let mut audit = Vec::new();
    let Some(accounts) = doc.get("accounts") else { return audit };
    let entries: Vec<&Value> = match accounts {
        Value::Array(records) => records.iter().collect(),
        Value::Object(records) => records.values().collect(),
        _ => return audit,
    };
    for account in entries {
        if let Some(window) = account.get("window") {
            audit.push(serde_json::json!({ "id": account.get("id"), "window": window }));
        }
    }
    audit
}

fn io_err(error: std::io::Error) -> CoreError {
    CoreError::MigrationFailure { message: error.to_string() }
}

fn ser_err(error: serde_json::Error) -> CoreError {
    CoreError::MigrationFailure { message: error.to_string() }
}
