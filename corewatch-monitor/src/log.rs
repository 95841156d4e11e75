//! The append-only error log: one event per line, a human-readable
//! structured record, rotated at a fixed cap with a single `.1` backup —
//! a pragmatic default for a desktop app.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use corewatch_types::{AccountId, CoreError, Result, Severity};

use crate::MonitorEvent;

/// Cap before rotation. 10 MiB is the production default; tests override
/// it to exercise rotation without writing gigabytes.
const DEFAULT_ROTATE_BYTES: u64 = 10 * 1024 * 1024;

/// One line of the on-disk error log — the durable, serializable subset of
/// a [`MonitorEvent`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorLogEntry {
    pub timestamp: DateTime<Utc>,
    pub account_id: Option<AccountId>,
    pub category: String,
    pub message: String,
    pub severity: Severity,
}

impl From<&MonitorEvent> for ErrorLogEntry {
    fn from(event: &MonitorEvent) -> Self {
        Self {
            timestamp: event.timestamp,
            account_id: event.account_id.clone(),
            category: event.category.to_string(),
            message: event.message.clone(),
            severity: event.severity,
        }
    }
}

/// Filter predicate for [`ErrorLog::read_filtered`].
#[derive(Debug, Clone, Default)]
pub struct ErrorLogFilter {
    pub account_id: Option<AccountId>,
    pub category: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl ErrorLogFilter {
    fn matches(&self, entry: &ErrorLogEntry) -> bool {
        if let Some(id) = &self.account_id {
            if entry.account_id.as_ref() != Some(id) {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if &entry.category != category {
                return false;
            }
        }
        if let Some(since) = self.since {
            if entry.timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if entry.timestamp > until {
                return false;
            }
        }
        true
    }
}

/// Append-only, newline-delimited JSON error log with a single rotation
/// step. All writes go through a single write guard so concurrent
/// appenders never interleave partial lines.
pub struct ErrorLog {
    path: PathBuf,
    rotate_at_bytes: u64,
    guard: Mutex<()>,
}

impl ErrorLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), rotate_at_bytes: DEFAULT_ROTATE_BYTES, guard: Mutex::new(()) }
    }

    pub fn with_rotate_at_bytes(mut self, bytes: u64) -> Self {
        self.rotate_at_bytes = bytes;
        self
    }

    pub async fn append(&self, event: &MonitorEvent) -> Result<()> {
        let _permit = self.guard.lock().await;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::StoreCorrupt { message: format!("error log dir: {e}") })?;
        }
        self.rotate_if_needed().await?;

        let entry = ErrorLogEntry::from(event);
        let line = serde_json::to_string(&entry)
            .map_err(|e| CoreError::StoreCorrupt { message: format!("serialize error log entry: {e}") })?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| CoreError::StoreCorrupt { message: format!("open error log: {e}") })?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| CoreError::StoreCorrupt { message: format!("write error log: {e}") })?;
        file.write_all(b"\n")
            .await
            .map_err(|e| CoreError::StoreCorrupt { message: format!("write error log: {e}") })?;
        Ok(())
    }

    async fn rotate_if_needed(&self) -> Result<()> {
        let Ok(metadata) = fs::metadata(&self.path).await else {
            return Ok(());
        };
        if metadata.len() < self.rotate_at_bytes {
            return Ok(());
        }
        let backup = self.backup_path();
        let _ = fs::remove_file(&backup).await;
        fs::rename(&self.path, &backup)
            .await
            .map_err(|e| CoreError::StoreCorrupt { message: format!("rotate error log: {e}") })?;
        Ok(())
    }

    fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".1");
        PathBuf::from(name)
    }

    /// Read every entry across both the live file and the `.1` backup,
    /// oldest first, applying `filter`.
    pub async fn read_filtered(&self, filter: &ErrorLogFilter) -> Result<Vec<ErrorLogEntry>> {
        let mut entries = Vec::new();
        for path in [self.backup_path(), self.path.clone()] {
            entries.extend(read_entries(&path).await?);
        }
        Ok(entries.into_iter().filter(|e| filter.matches(e)).collect())
    }
}

async fn read_entries(path: &Path) -> Result<Vec<ErrorLogEntry>> {
    let Ok(file) = File::open(path).await else {
        return Ok(Vec::new());
    };
    let mut lines = BufReader::new(file).lines();
    let mut entries = Vec::new();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| CoreError::StoreCorrupt { message: format!("read error log: {e}") })?
    {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ErrorLogEntry>(&line) {
            Ok(entry) => entries.push(entry),
            Err(_) => continue, // a torn/corrupt line is skipped, not fatal
        }
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use corewatch_types::AccountId;
    use std::collections::HashMap;

    fn sample_event(account_id: AccountId) -> MonitorEvent {
        let error = CoreError::InstanceCrash { account_id, message: "boom".to_string() };
        MonitorEvent::from_error(Utc::now(), &error, HashMap::new())
    }

    #[tokio::test]
    async fn append_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let log = ErrorLog::new(dir.path().join("errors.log"));
        let account = AccountId::generate();
        log.append(&sample_event(account.clone())).await.unwrap();

        let entries = log.read_filtered(&ErrorLogFilter::default()).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].account_id, Some(account));
        assert_eq!(entries[0].category, "InstanceCrash");
    }

    #[tokio::test]
    async fn filter_by_account_id() {
        let dir = tempfile::tempdir().unwrap();
        let log = ErrorLog::new(dir.path().join("errors.log"));
        let a1 = AccountId::generate();
        let a2 = AccountId::generate();
        log.append(&sample_event(a1.clone())).await.unwrap();
        log.append(&sample_event(a2.clone())).await.unwrap();

        let filter = ErrorLogFilter { account_id: Some(a1.clone()), ..Default::default() };
        let entries = log.read_filtered(&filter).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].account_id, Some(a1));
    }

    #[tokio::test]
    async fn rotation_keeps_a_single_backup() {
        let dir = tempfile::tempdir().unwrap();
        let log = ErrorLog::new(dir.path().join("errors.log")).with_rotate_at_bytes(1);
        let account = AccountId::generate();
        log.append(&sample_event(account.clone())).await.unwrap();
        log.append(&sample_event(account)).await.unwrap();

        assert!(dir.path().join("errors.log.1").exists());
        assert!(dir.path().join("errors.log").exists());
    }
}
