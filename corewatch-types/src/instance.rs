use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::AccountId;

/// Runtime lifecycle state of an instance. Not persisted — rebuilt from
/// observation on every start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstanceState {
    Stopped,
    Starting,
    Running,
    Error,
    Crashed,
}

/// Best-effort signal of whether the external chat service sees the
/// account as logged in. Heuristic, not ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoginStatus {
    Unknown,
    LoggedOut,
    LoggedIn,
}

impl Default for LoginStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Runtime companion to an [`AccountRecord`](crate::account::AccountRecord),
/// keyed by account id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatus {
    pub account_id: AccountId,
    pub state: InstanceState,
    pub pid: Option<u32>,
    pub memory_bytes: Option<u64>,
    pub cpu_percent: Option<f32>,
    pub started_at: Option<DateTime<Utc>>,
    pub last_heartbeat: Option<DateTime<Utc>>,
    /// Crashes recorded within the current crash window.
    pub crash_count_in_window: u32,
    pub last_error: Option<String>,
    pub login_status: LoginStatus,
    pub unread_count: u32,
}

impl InstanceStatus {
    pub fn stopped(account_id: AccountId) -> Self {
        Self {
            account_id,
            state: InstanceState::Stopped,
            pid: None,
            memory_bytes: None,
            cpu_percent: None,
            started_at: None,
            last_heartbeat: None,
            crash_count_in_window: 0,
            last_error: None,
            login_status: LoginStatus::Unknown,
            unread_count: 0,
        }
    }
}
