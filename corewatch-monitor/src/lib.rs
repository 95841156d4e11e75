//! Error & Monitoring Subsystem: the uniform failure taxonomy
//! recorder and the central event bus every other component publishes
//! status through. Also owns the ambient logging stack —
//! `corewatch-monitor::logging` is the one place `tracing_subscriber` gets
//! initialized, matching the dependency stack's own telemetry-init module.

pub mod bus;
pub mod log;
pub mod logging;
pub mod notification;

pub use bus::{EventBus, EventSource};
pub use log::{ErrorLog, ErrorLogEntry, ErrorLogFilter};
pub use logging::{init_tracing, LoggingConfig};
pub use notification::Notification;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use corewatch_types::{AccountId, CoreError, Severity};

/// Field names that must never reach the error log, an event's `details`
/// map, or an IPC error payload.
const SENSITIVE_FIELDS: &[&str] = &["password", "apiKey", "api_key", "proxyPassword"];

/// One published occurrence of a [`CoreError`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorEvent {
    pub timestamp: DateTime<Utc>,
    pub account_id: Option<AccountId>,
    pub category: &'static str,
    pub message: String,
    pub severity: Severity,
    pub details: HashMap<String, serde_json::Value>,
}

impl MonitorEvent {
    pub fn from_error(now: DateTime<Utc>, error: &CoreError, details: HashMap<String, serde_json::Value>) -> Self {
        Self {
            timestamp: now,
            account_id: error.account_id().cloned(),
            category: error.category(),
            message: error.to_string(),
            severity: error.severity(),
            details: redact(details),
        }
    }
}

/// Strip sensitive fields before they reach a log line or an event's
/// `details` map. Applied once here rather than trusted at every
/// call site.
pub fn redact(mut details: HashMap<String, serde_json::Value>) -> HashMap<String, serde_json::Value> {
    for field in SENSITIVE_FIELDS {
        details.remove(*field);
    }
    details
}

/// Extension trait mapping [`Severity`] to a `tracing` level: validation
/// and capacity noise at `info`, recoverable per-instance
/// faults at `warn`, everything that leaves durable or terminal state at
/// `error`. An inherent impl isn't possible here — `Severity` lives in
/// `corewatch-types` — so this is an extension trait instead.
pub trait SeverityExt {
    fn as_tracing_level(self) -> tracing::Level;
}

impl SeverityExt for Severity {
    fn as_tracing_level(self) -> tracing::Level {
        match self {
            Severity::Info => tracing::Level::INFO,
            Severity::Warn => tracing::Level::WARN,
            Severity::Error => tracing::Level::ERROR,
        }
    }
}
