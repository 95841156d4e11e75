//! Scenario coverage for the Instance Supervisor's crash-window policy:
//! three crashes inside the window schedule a restart, the fourth is
//! terminal until the user explicitly restarts.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{mpsc, Mutex};
use tokio::time::sleep;

use corewatch_isolation::{AppliedProxy, ViewSurfaceConfig};
use corewatch_supervisor::{CrashReason, InstanceSupervisor, SupervisorConfig, WorkerHandle, WorkerSpawner};
use corewatch_types::{AccountId, AccountRecord, InstanceState, NotificationSettings, ProxySettings, Result, TranslationSettings};

fn blank_record(id: AccountId, name: &str) -> AccountRecord {
    let now = Utc::now();
    AccountRecord {
        id: id.clone(),
        name: name.to_string(),
        note: String::new(),
        order: 0,
        created_at: now,
        last_active_at: now,
        auto_start: false,
        session_dir: format!("account_{id}"),
        proxy: ProxySettings::default(),
        translation: TranslationSettings::default(),
        notifications: NotificationSettings::default(),
    }
}

struct MockHandle {
    crashes: mpsc::Receiver<CrashReason>,
}

#[async_trait]
impl WorkerHandle for MockHandle {
    fn pid(&self) -> Option<u32> {
        Some(4242)
    }

    async fn sample_resources(&self) -> Result<(u64, f32)> {
        Ok((1024, 0.5))
    }

    async fn probe_liveness(&mut self, _timeout_after: Duration) -> Result<()> {
        Ok(())
    }

    async fn request_close(&mut self) -> Result<()> {
        Ok(())
    }

    async fn reload(&mut self, _ignore_cache: bool) -> Result<()> {
        Ok(())
    }

    async fn load_url(&mut self, _url: &str) -> Result<()> {
        Ok(())
    }

    async fn force_terminate(&mut self) -> Result<()> {
        Ok(())
    }

    async fn wait_crash(&mut self) -> CrashReason {
        self.crashes.recv().await.unwrap_or(CrashReason::Exited(None))
    }
}

/// Lets the test trigger a crash for a given account on demand, by handing
/// every respawn a fresh channel and keeping the live sender around.
#[derive(Default, Clone)]
struct MockSpawner {
    senders: Arc<Mutex<HashMap<AccountId, mpsc::Sender<CrashReason>>>>,
}

impl MockSpawner {
    async fn crash(&self, id: &AccountId, reason: CrashReason) {
        let sender = self.senders.lock().await.get(id).cloned();
        if let Some(sender) = sender {
            let _ = sender.send(reason).await;
        }
    }
}

#[async_trait]
impl WorkerSpawner for MockSpawner {
    async fn spawn(&self, account_id: &AccountId, _view_config: &ViewSurfaceConfig, _proxy: &AppliedProxy) -> Result<Box<dyn WorkerHandle>> {
        let (tx, rx) = mpsc::channel(4);
        self.senders.lock().await.insert(account_id.clone(), tx);
        Ok(Box::new(MockHandle { crashes: rx }))
    }
}

fn fast_config() -> SupervisorConfig {
    SupervisorConfig {
        max_instances: 30,
        max_crash_count: 3,
        crash_window: Duration::from_secs(60),
        restart_delay: Duration::from_millis(5),
        restart_cooldown: Duration::from_millis(5),
        hang_timeout: Duration::from_secs(30),
        health_tick_interval: Duration::from_secs(10),
        liveness_probe_timeout: Duration::from_secs(5),
        destroy_timeout: Duration::from_millis(50),
        resource_warning_pct: 75.0,
        resource_limit_pct: 90.0,
    }
}

#[tokio::test]
async fn three_crashes_auto_restart_the_fourth_trips_the_threshold() {
    let tmp = tempfile::tempdir().unwrap();
    let bus = Arc::new(corewatch_monitor::EventBus::new(corewatch_monitor::ErrorLog::new(tmp.path().join("errors.log"))));
    let spawner = MockSpawner::default();
    let supervisor = InstanceSupervisor::new(fast_config(), Arc::new(spawner.clone()), tmp.path(), bus);

    let id = AccountId::generate();
    let record = blank_record(id.clone(), "Crash Test");
    supervisor.create(record).await.unwrap();

    sleep(Duration::from_millis(20)).await;
    let status = supervisor.get_status(&id).await.unwrap();
    assert_eq!(status.state, InstanceState::Running);

    for _ in 0..3 {
        spawner.crash(&id, CrashReason::Exited(Some(1))).await;
        sleep(Duration::from_millis(40)).await;
        let status = supervisor.get_status(&id).await.unwrap();
        assert!(matches!(status.state, InstanceState::Starting | InstanceState::Running));
    }

    spawner.crash(&id, CrashReason::Exited(Some(1))).await;
    sleep(Duration::from_millis(40)).await;
    let status = supervisor.get_status(&id).await.unwrap();
    assert_eq!(status.state, InstanceState::Crashed);
    assert_eq!(status.crash_count_in_window, 4);

    supervisor.reset_and_restart(&id).await.unwrap();
    sleep(Duration::from_millis(40)).await;
    let status = supervisor.get_status(&id).await.unwrap();
    assert_eq!(status.state, InstanceState::Running);
}

#[tokio::test]
async fn create_refuses_once_at_capacity() {
    let tmp = tempfile::tempdir().unwrap();
    let bus = Arc::new(corewatch_monitor::EventBus::new(corewatch_monitor::ErrorLog::new(tmp.path().join("errors.log"))));
    let spawner = MockSpawner::default();
    let mut config = fast_config();
    config.max_instances = 1;
    let supervisor = InstanceSupervisor::new(config, Arc::new(spawner), tmp.path(), bus);

    let first = AccountId::generate();
    supervisor.create(blank_record(first.clone(), "First")).await.unwrap();

    let second = AccountId::generate();
    let err = supervisor.create(blank_record(second, "Second")).await.unwrap_err();
    assert!(matches!(err, corewatch_types::CoreError::Capacity { max_instances: 1 }));
    assert_eq!(supervisor.instance_count().await, 1);
}

#[tokio::test]
async fn destroy_then_get_status_is_not_found() {
    let tmp = tempfile::tempdir().unwrap();
    let bus = Arc::new(corewatch_monitor::EventBus::new(corewatch_monitor::ErrorLog::new(tmp.path().join("errors.log"))));
    let spawner = MockSpawner::default();
    let supervisor = InstanceSupervisor::new(fast_config(), Arc::new(spawner), tmp.path(), bus);

    let id = AccountId::generate();
    supervisor.create(blank_record(id.clone(), "Transient")).await.unwrap();
    supervisor.destroy(&id).await.unwrap();

    let err = supervisor.get_status(&id).await.unwrap_err();
    assert!(matches!(err, corewatch_types::CoreError::NotFound { .. }));
}
