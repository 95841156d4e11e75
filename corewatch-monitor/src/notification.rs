//! The shell-facing notification set. The IPC layer's only job for these
//! is relaying bus events whose scope is shell-visible — this crate owns
//! the type so `corewatch-ipc` doesn't redefine it.

use serde::{Deserialize, Serialize};

use corewatch_types::{AccountId, InstanceStatus, LoginStatus};

/// One of the main → shell notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "channel", content = "payload", rename_all = "kebab-case")]
pub enum Notification {
    AccountsUpdated,
    AccountActiveChanged {
        account_id: Option<AccountId>,
    },
    InstanceStatusChanged {
        account_id: AccountId,
        status: InstanceStatus,
    },
    ViewSwitching {
        from: Option<AccountId>,
        to: AccountId,
    },
    ViewSwitched {
        from: Option<AccountId>,
        to: AccountId,
    },
    ViewSwitchFailed {
        from: Option<AccountId>,
        to: AccountId,
        error: String,
    },
    ViewReady {
        account_id: AccountId,
    },
    ViewError {
        account_id: AccountId,
        code: Option<i32>,
        message: String,
    },
    ViewCrashed {
        account_id: AccountId,
    },
    LoginStatusChanged {
        account_id: AccountId,
        status: LoginStatus,
    },
    ConnectionStatusChanged {
        account_id: AccountId,
        connected: bool,
    },
    AccountError {
        account_id: AccountId,
        category: String,
        message: String,
    },
    GlobalError {
        category: String,
        message: String,
    },
}

impl Notification {
    /// The channel name this notification is published under — used by
    /// the IPC layer's whitelist and by tests asserting bracket ordering.
    pub fn channel(&self) -> &'static str {
        match self {
            Self::AccountsUpdated => "accounts-updated",
            Self::AccountActiveChanged { .. } => "account-active-changed",
            Self::InstanceStatusChanged { .. } => "instance-status-changed",
            Self::ViewSwitching { .. } => "view-switching",
            Self::ViewSwitched { .. } => "view-switched",
            Self::ViewSwitchFailed { .. } => "view-switch-failed",
            Self::ViewReady { .. } => "view-ready",
            Self::ViewError { .. } => "view-error",
            Self::ViewCrashed { .. } => "view-crashed",
            Self::LoginStatusChanged { .. } => "login-status-changed",
            Self::ConnectionStatusChanged { .. } => "connection-status-changed",
            Self::AccountError { .. } => "account-error",
            Self::GlobalError { .. } => "global-error",
        }
    }
}
