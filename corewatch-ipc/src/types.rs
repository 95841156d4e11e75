//! Request and response payloads for the IPC surface. Every
//! type here is the JSON shape a channel actually carries; none of them
//! are reused directly from `corewatch-types` when the channel combines
//! fields that type doesn't (e.g. `account.update` needs both an id and a
//! patch in one body).

use serde::{Deserialize, Serialize};

use corewatch_isolation::PartitionStats;
use corewatch_types::{AccountId, AccountPatch, AccountRecord, InstanceStatus, LoginStatus, ProxySettings};

/// `account.list` element: an account's durable record plus its live
/// instance status. Instances that have never been started report
/// [`InstanceStatus::stopped`].
#[derive(Debug, Clone, Serialize)]
pub struct AccountRecordWithStatus {
    #[serde(flatten)]
    pub record: AccountRecord,
    pub status: InstanceStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountIdRequest {
    pub id: AccountId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountUpdateRequest {
    pub id: AccountId,
    pub patch: AccountPatch,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountDeleteRequest {
    pub id: AccountId,
    #[serde(default)]
    pub retain_storage: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountReorderRequest {
    pub id_sequence: Vec<AccountId>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstanceProxyUpdateRequest {
    pub id: AccountId,
    pub proxy: ProxySettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewSwitchToIndexRequest {
    pub index: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewReloadRequest {
    pub id: AccountId,
    #[serde(default)]
    pub ignore_cache: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ViewLoadUrlRequest {
    pub id: AccountId,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionHasDataResponse {
    pub has_data: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionStatsResponse {
    pub size_bytes: u64,
    pub file_count: u64,
    pub has_data: bool,
}

impl From<PartitionStats> for SessionStatsResponse {
    fn from(stats: PartitionStats) -> Self {
        Self { size_bytes: stats.size_bytes, file_count: stats.file_count, has_data: stats.has_data }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionDetectLoginResponse {
    pub status: LoginStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewActiveResponse {
    pub account_id: Option<AccountId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MigrationStatusResponse {
    pub completed: bool,
}
