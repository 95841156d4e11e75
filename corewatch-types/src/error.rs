use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ids::AccountId;

/// The full failure taxonomy shared by every component.
///
/// Categories, not source types: the same `ProxyFailure` is raised whether
/// the proxy rejected a handshake or DNS resolution failed. `category()`
/// returns the fixed string the propagation policy and the error log key
/// off of, so callers never hand-roll a second copy of this match.
#[derive(Debug, Error, Clone, Serialize, Deserialize)]
pub enum CoreError {
    #[error("instance {account_id} crashed: {message}")]
    InstanceCrash { account_id: AccountId, message: String },

    #[error("instance {account_id} is unresponsive")]
    Unresponsive { account_id: AccountId },

    #[error("proxy failure for {account_id}: {message}")]
    ProxyFailure { account_id: AccountId, message: String },

    #[error("page load failed for {account_id}: {message}")]
    PageLoadFailure { account_id: AccountId, code: Option<i32>, message: String },

    #[error("content-script injection failed for {account_id}: {message}")]
    InjectionFailure { account_id: AccountId, message: String },

    #[error("restart failed for {account_id}: {message}")]
    RestartFailure { account_id: AccountId, message: String },

    #[error("{account_id} exceeded the crash threshold ({crash_count} crashes)")]
    CrashThresholdExceeded { account_id: AccountId, crash_count: u32 },

    #[error("validation failed: {errors:?}")]
    ValidationError { errors: Vec<String> },

    #[error("not found: {id}")]
    NotFound { id: String },

    #[error("duplicate id: {id}")]
    DuplicateId { id: String },

    #[error("at capacity ({max_instances} instances running)")]
    Capacity { max_instances: usize },

    #[error("registry store is corrupt: {message}")]
    StoreCorrupt { message: String },

    #[error("migration failed: {message}")]
    MigrationFailure { message: String },
}

impl CoreError {
    /// The fixed category string used by the error log, the event bus,
    /// and the IPC error payload so all three agree.
    pub fn category(&self) -> &'static str {
        match self {
            Self::InstanceCrash { .. } => "InstanceCrash",
            Self::Unresponsive { .. } => "Unresponsive",
            Self::ProxyFailure { .. } => "ProxyFailure",
            Self::PageLoadFailure { .. } => "PageLoadFailure",
            Self::InjectionFailure { .. } => "InjectionFailure",
            Self::RestartFailure { .. } => "RestartFailure",
            Self::CrashThresholdExceeded { .. } => "CrashThresholdExceeded",
            Self::ValidationError { .. } => "ValidationError",
            Self::NotFound { .. } => "NotFound",
            Self::DuplicateId { .. } => "DuplicateId",
            Self::Capacity { .. } => "Capacity",
            Self::StoreCorrupt { .. } => "StoreCorrupt",
            Self::MigrationFailure { .. } => "MigrationFailure",
        }
    }

    /// The account this error is scoped to, if any.
    pub fn account_id(&self) -> Option<&AccountId> {
        match self {
            Self::InstanceCrash { account_id, .. }
            | Self::Unresponsive { account_id, .. }
            | Self::ProxyFailure { account_id, .. }
            | Self::PageLoadFailure { account_id, .. }
            | Self::InjectionFailure { account_id, .. }
            | Self::RestartFailure { account_id, .. }
            | Self::CrashThresholdExceeded { account_id, .. } => Some(account_id),
            _ => None,
        }
    }

    /// Severity this category should log at.
    pub fn severity(&self) -> Severity {
        match self {
            Self::ValidationError { .. } | Self::NotFound { .. } | Self::DuplicateId { .. } | Self::Capacity { .. } => {
                Severity::Info
            }
            Self::ProxyFailure { .. }
            | Self::InjectionFailure { .. }
            | Self::PageLoadFailure { .. }
            | Self::Unresponsive { .. } => Severity::Warn,
            Self::InstanceCrash { .. }
            | Self::CrashThresholdExceeded { .. }
            | Self::StoreCorrupt { .. }
            | Self::MigrationFailure { .. }
            | Self::RestartFailure { .. } => Severity::Error,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

pub type Result<T> = std::result::Result<T, CoreError>;
