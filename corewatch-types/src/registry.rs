use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::account::AccountRecord;
use crate::ids::AccountId;

/// Schema version embedded in the on-disk registry file.
pub mod schema_version {
    pub const PRE_MIGRATION: &str = "1.0.0";
    pub const POST_MIGRATION: &str = "2.0.0";
}

/// The on-disk registry document: `{version, accounts, migratedAt?, migratedFrom?}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryDocument {
    pub version: String,
    pub accounts: HashMap<AccountId, AccountRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migrated_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub migrated_from: Option<String>,
}

impl RegistryDocument {
    pub fn empty() -> Self {
        Self {
            version: schema_version::POST_MIGRATION.to_string(),
            accounts: HashMap::new(),
            migrated_at: None,
            migrated_from: None,
        }
    }

    /// Records sorted by `order`, the invariant display iteration uses.
    pub fn sorted_by_order(&self) -> Vec<AccountRecord> {
        let mut records: Vec<AccountRecord> = self.accounts.values().cloned().collect();
        records.sort_by_key(|r| r.order);
        records
    }

    pub fn next_order(&self) -> u32 {
        self.accounts.values().map(|r| r.order).max().map_or(0, |m| m + 1)
    }

    /// True iff `ids` is exactly a permutation of the current account ids.
    pub fn is_permutation_of_ids(&self, ids: &[AccountId]) -> bool {
        if ids.len() != self.accounts.len() {
            return false;
        }
        let mut seen: std::collections::HashSet<&AccountId> = std::collections::HashSet::new();
        for id in ids {
            if !self.accounts.contains_key(id) || !seen.insert(id) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ResourceLimits {
    /// Default 30.
    pub max_instances: usize,
    /// System usage fraction (0-100) at which a warning is published.
    pub warning_pct: f32,
    /// System usage fraction (0-100) at which new `create` calls are refused.
    pub limit_pct: f32,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self { max_instances: 30, warning_pct: 75.0, limit_pct: 90.0 }
    }
}

/// Process-wide state that is not a property of any single account.
#[derive(Debug, Clone, Default)]
pub struct GlobalState {
    pub active_account_id: Option<AccountId>,
    pub sidebar_width: u32,
    pub resource_limits: ResourceLimits,
    pub migration_completed: bool,
}

pub const SIDEBAR_WIDTH_MIN: u32 = 200;
pub const SIDEBAR_WIDTH_MAX: u32 = 480;
pub const SIDEBAR_WIDTH_DEFAULT: u32 = 260;
