//! Account/Instance Supervisor: owns the lifecycle of every
//! account's isolated execution environment — spawn, crash supervision
//! with bounded auto-restart, health probing, an optional resource
//! ceiling, and a hard cap on how many instances may run at once.

mod actor;
pub mod crash;
pub mod resource;
pub mod supervisor;
pub mod worker;

pub use crash::{
    DEFAULT_CRASH_WINDOW, DEFAULT_HANG_TIMEOUT, DEFAULT_HEALTH_TICK_INTERVAL, DEFAULT_LIVENESS_PROBE_TIMEOUT,
    DEFAULT_MAX_CRASH_COUNT, DEFAULT_RESTART_COOLDOWN, DEFAULT_RESTART_DELAY,
};
pub use resource::{ResourceMonitor, ResourceState};
pub use supervisor::{InstanceSupervisor, SupervisorConfig};
pub use worker::{CrashReason, ProcessWorkerSpawner, WorkerHandle, WorkerSpawner};

use std::time::Duration;

/// Default global instance cap.
pub const DEFAULT_MAX_INSTANCES: usize = 30;
pub const DEFAULT_RESOURCE_WARNING_PCT: f32 = 75.0;
pub const DEFAULT_RESOURCE_LIMIT_PCT: f32 = 90.0;
pub const DEFAULT_DESTROY_TIMEOUT: Duration = Duration::from_secs(5);
