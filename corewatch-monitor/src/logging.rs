//! Structured logging bootstrap.
//! Mirrors the dependency stack's own telemetry-init module: a small
//! builder, a `tracing_subscriber` registry with an env filter and an fmt
//! layer, and a `Once` guard so re-entrant calls (tests, multiple
//! `Application` instances in one process) don't panic.

use std::sync::Once;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

/// Configuration for [`init_tracing`].
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` isn't set, e.g. `"info"`.
    pub default_level: String,
    /// Emit one JSON object per line instead of the human-readable
    /// formatter — useful when the shell pipes stderr into its own log
    /// aggregation rather than a terminal.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { default_level: "info".to_string(), json: false }
    }
}

impl LoggingConfig {
    pub fn with_default_level(mut self, level: impl Into<String>) -> Self {
        self.default_level = level.into();
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }
}

/// Install the global `tracing` subscriber. Safe to call more than once
/// per process — only the first call takes effect.
pub fn init_tracing(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.default_level));
        let registry = tracing_subscriber::registry().with(filter);
        if config.json {
            let _ = registry.with(tracing_subscriber::fmt::layer().json()).try_init();
        } else {
            let _ = registry.with(tracing_subscriber::fmt::layer()).try_init();
        }
    });
}
