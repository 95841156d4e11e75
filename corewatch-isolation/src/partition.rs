//! The exclusive on-disk storage root for one account's runtime:
//! `profiles/account_{a}`. The core treats it as an opaque directory it
//! exclusively owns and may recursively delete.

use std::path::{Path, PathBuf};

use corewatch_types::{AccountId, CoreError, Result};

/// Sub-paths whose presence signals "this partition has real session
/// data" — the same predicate the Migration Engine's Verify step uses
/// and `session.hasData` reports. Named after the storage subsystems a
/// web-platform session actually persists: cookies, local storage,
/// indexed storage, service-worker caches, media cache. An embedded
/// runtime is free to use any subset of these; "has data" is true if any
/// one of them is non-empty.
const DATA_SIGNAL_SUBPATHS: &[&str] = &["Cookies", "Local Storage", "IndexedDB", "Service Worker", "Cache"];

/// Create (if absent) and return the partition directory for `id` under
/// `profiles_root`.
pub async fn ensure_partition(profiles_root: &Path, id: &AccountId) -> Result<PathBuf> {
    let dir = profiles_root.join(corewatch_types::paths::partition_dir_name(id));
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| CoreError::ProxyFailure { account_id: id.clone(), message: format!("create partition dir: {e}") })?;
    tracing::debug!(account_id = %id, path = %dir.display(), "isolation: partition ensured");
    Ok(dir)
}

/// Byte size (best-effort recursive walk), file count, and whether the
/// partition "has data".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PartitionStats {
    pub size_bytes: u64,
    pub file_count: u64,
    pub has_data: bool,
}

/// Recursively walk `partition_dir`, returning zeroed stats if it doesn't
/// exist (a never-started account has no partition yet — that's not an
/// error).
pub async fn partition_stats(partition_dir: &Path) -> Result<PartitionStats> {
    if !partition_dir.exists() {
        return Ok(PartitionStats::default());
    }
    let mut stats = PartitionStats::default();
    walk(partition_dir, &mut stats).await?;
    stats.has_data = has_session_data(partition_dir);
    Ok(stats)
}

/// Presence of any expected sub-path (cookies, local storage, ...) counts
/// as "has data". Shared by `session.detectLogin`/`session.stats` and the
/// migration engine's verify step so both consumers agree on one
/// predicate.
pub fn has_session_data(partition_dir: &Path) -> bool {
    DATA_SIGNAL_SUBPATHS.iter().any(|sub| partition_dir.join(sub).exists())
}

fn walk<'a>(dir: &'a Path, stats: &'a mut PartitionStats) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
    Box::pin(async move {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(_) => return Ok(()),
        };
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CoreError::StoreCorrupt { message: format!("walk partition dir: {e}") })?
        {
            let metadata = match entry.metadata().await {
                Ok(m) => m,
                Err(_) => continue,
            };
            if metadata.is_dir() {
                walk(&entry.path(), stats).await?;
            } else {
                stats.file_count += 1;
                stats.size_bytes += metadata.len();
            }
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stats_of_a_missing_partition_are_zeroed() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("account_none");
        let stats = partition_stats(&missing).await.unwrap();
        assert_eq!(stats, PartitionStats::default());
    }

    #[tokio::test]
    async fn has_data_detects_a_cookies_subpath() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(dir.path().join("Cookies")).await.unwrap();
        assert!(has_session_data(dir.path()));
    }

    #[tokio::test]
    async fn has_data_is_false_for_an_empty_partition() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!has_session_data(dir.path()));
    }

    #[tokio::test]
    async fn stats_count_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::create_dir_all(dir.path().join("Local Storage/leveldb")).await.unwrap();
        tokio::fs::write(dir.path().join("Local Storage/leveldb/000003.log"), b"abc").await.unwrap();

        let stats = partition_stats(dir.path()).await.unwrap();
        assert_eq!(stats.file_count, 1);
        assert_eq!(stats.size_bytes, 3);
        assert!(stats.has_data);
    }

    #[tokio::test]
    async fn ensure_partition_creates_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let id = AccountId::generate();
        let path = ensure_partition(dir.path(), &id).await.unwrap();
        assert!(path.exists());
        assert_eq!(path.file_name().unwrap().to_str().unwrap(), format!("account_{id}"));
    }
}
