//! The central, in-process event bus: single-producer-per-source,
//! many-subscriber, with events delivered in publication order per source;
//! ordering across sources is not guaranteed.
//!
//! A `tokio::sync::broadcast` channel already gives every subscriber the
//! full, globally-ordered stream of sends; since each [`EventSource`] only
//! ever calls `publish`/`notify` from its own serialized logic (the
//! Supervisor serializes per instance id, the Switching Engine serializes
//! `switchTo`), per-source order falls out of call order — the bus itself
//! doesn't need to track sources separately.

use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::broadcast;
use tracing::{event, Level};

use corewatch_types::CoreError;

use crate::{ErrorLog, MonitorEvent, Notification, SeverityExt};

const EVENT_CHANNEL_CAPACITY: usize = 1024;
const NOTIFICATION_CHANNEL_CAPACITY: usize = 1024;

/// A named producer handle. Purely documentary today (the bus is a single
/// shared broadcast channel under the hood) but gives call sites a stable
/// `source` string to tag log lines with, and is the extension point if a
/// future per-source ordering guarantee needs its own queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSource {
    ConfigStore,
    Isolation,
    Supervisor,
    SwitchEngine,
    Migration,
    Ipc,
}

impl EventSource {
    fn as_str(self) -> &'static str {
        match self {
            Self::ConfigStore => "config-store",
            Self::Isolation => "isolation",
            Self::Supervisor => "supervisor",
            Self::SwitchEngine => "switch-engine",
            Self::Migration => "migration",
            Self::Ipc => "ipc",
        }
    }
}

/// Central bus: `CoreError` occurrences go to subscribers *and* the error
/// log; shell-facing [`Notification`]s go only to subscribers. Held behind
/// an `Arc` by every component that needs to publish.
pub struct EventBus {
    events: broadcast::Sender<MonitorEvent>,
    notifications: broadcast::Sender<Notification>,
    log: ErrorLog,
}

impl EventBus {
    pub fn new(log: ErrorLog) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (notifications, _) = broadcast::channel(NOTIFICATION_CHANNEL_CAPACITY);
        Self { events, notifications, log }
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<MonitorEvent> {
        self.events.subscribe()
    }

    pub fn subscribe_notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Record a [`CoreError`], at the source's granularity: logs it at its
    /// mapped severity, appends a structured line to the
    /// error log, and broadcasts it to subscribers. Never panics or
    /// propagates a failure to append — a monitoring write failing must not
    /// take down the component reporting the original error.
    pub async fn publish_error(&self, source: EventSource, error: &CoreError) {
        self.publish_error_with_details(source, error, HashMap::new()).await;
    }

    pub async fn publish_error_with_details(
        &self,
        source: EventSource,
        error: &CoreError,
        details: HashMap<String, serde_json::Value>,
    ) {
        let event = MonitorEvent::from_error(Utc::now(), error, details);
        log_monitor_event(source, &event);
        if let Err(write_err) = self.log.append(&event).await {
            tracing::warn!(source = source.as_str(), error = %write_err, "failed to append to error log");
        }
        // A broadcast send fails only when there are no subscribers; that's
        // an expected steady state (no shell attached yet), not a fault.
        let _ = self.events.send(event);
    }

    /// Broadcast a shell-facing notification. Does not log or persist —
    /// notifications are transient UI signals, not the failure record.
    pub fn notify(&self, notification: Notification) {
        let _ = self.notifications.send(notification);
    }

    pub fn error_log(&self) -> &ErrorLog {
        &self.log
    }
}

fn log_monitor_event(source: EventSource, event: &MonitorEvent) {
    let level = event.severity.as_tracing_level();
    match level {
        Level::ERROR => {
            event!(Level::ERROR, source = source.as_str(), category = event.category, account_id = ?event.account_id, "{}", event.message)
        }
        Level::WARN => {
            event!(Level::WARN, source = source.as_str(), category = event.category, account_id = ?event.account_id, "{}", event.message)
        }
        _ => {
            event!(Level::INFO, source = source.as_str(), category = event.category, account_id = ?event.account_id, "{}", event.message)
        }
    }
}
