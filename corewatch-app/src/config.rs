//! Tunables for one running [`crate::Application`].

use std::net::SocketAddr;
use std::path::PathBuf;

use corewatch_supervisor::SupervisorConfig;

/// Explicit override for the user-data root. Checked before falling back
/// to the OS per-user application-data directory.
pub const USER_DATA_DIR_ENV: &str = "COREWATCH_USER_DATA_DIR";

/// Construct with [`ApplicationConfig::default`] and override selectively —
/// the same pattern [`SupervisorConfig`] uses one level down.
#[derive(Debug, Clone)]
pub struct ApplicationConfig {
    pub data_dir: PathBuf,
    pub bind_addr: SocketAddr,
    pub supervisor: SupervisorConfig,
    /// Program the default `ProcessWorkerSpawner` launches once per
    /// account. A full desktop build points this at the embedding
    /// toolkit's own renderer-host binary; left at the default, it
    /// re-execs this same binary in its placeholder worker-host mode.
    pub worker_program: String,
    pub worker_args: Vec<String>,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        let worker_program =
            std::env::current_exe().map(|path| path.to_string_lossy().into_owned()).unwrap_or_else(|_| "corewatch".to_string());
        Self {
            data_dir: resolve_data_dir(),
            bind_addr: "127.0.0.1:4317".parse().expect("valid default bind address"),
            supervisor: SupervisorConfig::default(),
            worker_program,
            worker_args: vec!["--worker-host".to_string()],
        }
    }
}

/// Resolve the default user-data root: an explicit [`USER_DATA_DIR_ENV`]
/// override, else the OS per-user application-data directory.
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(USER_DATA_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("corewatch")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_override_wins_over_the_os_default() {
        std::env::set_var(USER_DATA_DIR_ENV, "/tmp/corewatch-test-override");
        assert_eq!(resolve_data_dir(), PathBuf::from("/tmp/corewatch-test-override"));
        std::env::remove_var(USER_DATA_DIR_ENV);
    }

    #[test]
    fn empty_env_override_falls_back_to_the_os_default() {
        std::env::set_var(USER_DATA_DIR_ENV, "");
        assert_ne!(resolve_data_dir(), PathBuf::from(""));
        std::env::remove_var(USER_DATA_DIR_ENV);
    }
}
