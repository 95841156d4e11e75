//! Parsing for the legacy per-account-window on-disk layout.
//! Deliberately loose: the legacy schema predates the current
//! [`corewatch_types::RegistryDocument`] and is read generically rather
//! than modeled as a second rigid struct, since the only two things this
//! engine needs from it are "does a record carry window geometry" and
//! "what are this record's durable fields."

use serde::Deserialize;
use serde_json::Value;

use corewatch_types::{NotificationSettings, ProxySettings, TranslationSettings};

/// Window geometry embedded in a legacy account record — preserved only
/// as an audit artifact, never restored.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LegacyWindowGeometry {
    pub x: i32,
    pub y: i32,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

/// The fields this engine actually carries forward. Everything else in
/// the legacy JSON, window geometry included, is read but not retained in
/// the post-migration record.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyAccountRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub note: String,
    #[serde(default, rename = "sessionDir")]
    pub session_dir: Option<String>,
    #[serde(default)]
    pub proxy: Option<ProxySettings>,
    #[serde(default)]
    pub translation: Option<TranslationSettings>,
    #[serde(default)]
    pub notifications: Option<NotificationSettings>,
    #[serde(default)]
    pub window: Option<LegacyWindowGeometry>,
}

/// True if `doc`'s `accounts` collection (array or map, either legacy
/// shape is tolerated) contains at least one record with a `window`
/// object — the telltale sign of the legacy single-session layout.
pub fn has_embedded_geometry(doc: &Value) -> bool {
    let Some(accounts) = doc.get("accounts") else { return false };
    match accounts {
        Value::Array(records) => records.iter().any(|r| r.get("window").is_some()),
        Value::Object(records) => records.values().any(|r| r.get("window").is_some()),
        _ => false,
    }
}

/// Parse every account record out of `doc`'s `accounts` collection,
/// tolerating either the legacy array shape or an object keyed by id.
/// Records that don't even parse as a [`LegacyAccountRecord`] are
/// reported as a per-record error rather than aborting the whole batch.
pub fn parse_legacy_accounts(doc: &Value) -> (Vec<LegacyAccountRecord>, Vec<String>) {
    let mut records = Vec::new();
    let mut parse_errors = Vec::new();

    let raw_records: Vec<&Value> = match doc.get("accounts") {
        Some(Value::Array(records)) => records.iter().collect(),
        Some(Value::Object(records)) => records.values().collect(),
        _ => return (records, parse_errors),
    };

    for raw in raw_records {
        match serde_json::from_value::<LegacyAccountRecord>(raw.clone()) {
            Ok(record) => records.push(record),
            Err(error) => parse_errors.push(format!("unparseable legacy record: {error}")),
        }
    }
    (records, parse_errors)
}
