//! Migration Engine: detects the legacy single-session,
//! per-window-geometry on-disk layout and upgrades it to the current
//! multi-account registry once, idempotently, before the Supervisor
//! starts accepting work.

mod engine;
mod legacy;

pub use engine::{
    MigrationEngine, MigrationOutcome, BACKUP_DIR_NAME, COMPLETION_LOG_NAME, LEGACY_SESSION_DIR_NAME,
    PARTITIONS_DIR_NAME, SENTINEL_FILE_NAME,
};
pub use legacy::{has_embedded_geometry, parse_legacy_accounts, LegacyAccountRecord, LegacyWindowGeometry};
