//! The View Switching Engine: multiplexes N warm account views
//! onto a single visible viewport with bounded-latency, serialized,
//! last-target-wins switches.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use corewatch_monitor::{EventBus, Notification};
use corewatch_supervisor::InstanceSupervisor;
use corewatch_types::{AccountId, AccountRecord, CoreError, InstanceState, Result, ViewState};

use crate::bounds::ViewBounds;
use crate::state::ViewEntry;

/// How long `ensureView` polls a newly-created runtime for `running`
/// before giving up.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(10);
const READY_POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Debounce window for `resizeActiveTo`.
pub const DEFAULT_RESIZE_DEBOUNCE: Duration = Duration::from_millis(16);

pub struct SwitchEngine {
    supervisor: Arc<InstanceSupervisor>,
    bus: Arc<EventBus>,
    views: Mutex<HashMap<AccountId, ViewEntry>>,
    active: Mutex<Option<AccountId>>,
    /// The full record of whichever target a `switchTo` caller most
    /// recently asked for; whoever holds `switch_guard` drains this, so
    /// calls that arrive while a switch is executing coalesce onto the
    /// last value written here regardless of who wrote it. Storing the
    /// record (not just the id) lets whichever caller happens to drain it
    /// execute a switch it didn't personally request.
    latest_request: Mutex<Option<AccountRecord>>,
    switch_guard: Mutex<()>,
    resize_debounce: Duration,
    active_bounds: Mutex<Option<ViewBounds>>,
    resize_generation: Mutex<u64>,
}

impl SwitchEngine {
    pub fn new(supervisor: Arc<InstanceSupervisor>, bus: Arc<EventBus>) -> Self {
        Self {
            supervisor,
            bus,
            views: Mutex::new(HashMap::new()),
            active: Mutex::new(None),
            latest_request: Mutex::new(None),
            switch_guard: Mutex::new(()),
            resize_debounce: DEFAULT_RESIZE_DEBOUNCE,
            active_bounds: Mutex::new(None),
            resize_generation: Mutex::new(0),
        }
    }

    pub fn with_resize_debounce(mut self, debounce: Duration) -> Self {
        self.resize_debounce = debounce;
        self
    }

    pub async fn active_id(&self) -> Option<AccountId> {
        self.active.lock().await.clone()
    }

    pub async fn view_state(&self, id: &AccountId) -> Option<ViewState> {
        self.views.lock().await.get(id).map(|entry| entry.state)
    }

    /// Idempotent: create a view bound to `record`'s runtime if absent.
    /// Blocks until the view is `ready` or fails.
    pub async fn ensure_view(&self, record: &AccountRecord) -> Result<()> {
        {
            let mut views = self.views.lock().await;
            match views.get(&record.id) {
                Some(entry) if entry.state == ViewState::Ready => return Ok(()),
                Some(_) => {}
                None => {
                    views.insert(record.id.clone(), ViewEntry::created());
                }
            }
        }

        let existing = self.supervisor.get_status(&record.id).await;
        match existing {
            Ok(status) if status.state == InstanceState::Running => {
                self.set_state(&record.id, ViewState::Ready).await;
                Ok(())
            }
            Ok(status) if matches!(status.state, InstanceState::Starting) => {
                self.set_state(&record.id, ViewState::Loading).await;
                self.wait_until_ready(&record.id).await
            }
            Ok(status) if matches!(status.state, InstanceState::Crashed | InstanceState::Error) => {
                self.set_state(&record.id, ViewState::Error).await;
                Err(CoreError::PageLoadFailure {
                    account_id: record.id.clone(),
                    code: None,
                    message: "runtime is not healthy".to_string(),
                })
            }
            Ok(_) | Err(CoreError::NotFound { .. }) => {
                self.set_state(&record.id, ViewState::Loading).await;
                self.supervisor.create(record.clone()).await?;
                self.wait_until_ready(&record.id).await
            }
            Err(error) => Err(error),
        }
    }

    async fn wait_until_ready(&self, id: &AccountId) -> Result<()> {
        let deadline = Instant::now() + READY_POLL_TIMEOUT;
        loop {
            match self.supervisor.get_status(id).await {
                Ok(status) if status.state == InstanceState::Running => {
                    self.set_state(id, ViewState::Ready).await;
                    return Ok(());
                }
                Ok(status) if matches!(status.state, InstanceState::Crashed | InstanceState::Error) => {
                    self.set_state(id, ViewState::Error).await;
                    return Err(CoreError::PageLoadFailure {
                        account_id: id.clone(),
                        code: None,
                        message: status.last_error.unwrap_or_else(|| "view failed to load".to_string()),
                    });
                }
                Ok(_) => {}
                Err(error) => return Err(error),
            }
            if Instant::now() >= deadline {
                self.set_state(id, ViewState::Error).await;
                return Err(CoreError::PageLoadFailure { account_id: id.clone(), code: None, message: "timed out waiting for ready".to_string() });
            }
            sleep(READY_POLL_INTERVAL).await;
        }
    }

    async fn set_state(&self, id: &AccountId, state: ViewState) {
        let mut views = self.views.lock().await;
        views.entry(id.clone()).or_insert_with(ViewEntry::created).state = state;
    }

    /// Atomic, serialized, last-target-wins switch. Returns
    /// `Ok(())` once some switch round has settled — not necessarily to
    /// the id this particular call requested, if a later call superseded
    /// it while this one was queued.
    pub async fn switch_to(&self, record: &AccountRecord) -> Result<()> {
        if self.active.lock().await.as_ref() == Some(&record.id) {
            return Ok(());
        }

        *self.latest_request.lock().await = Some(record.clone());
        let _permit = self.switch_guard.lock().await;

        let target = { self.latest_request.lock().await.take() };
        let Some(target) = target else {
            // Superseded and already handled by the call that held the
            // guard before us.
            return Ok(());
        };
        if self.active.lock().await.as_ref() == Some(&target.id) {
            return Ok(());
        }

        self.perform_switch(&target).await
    }

    async fn perform_switch(&self, record: &AccountRecord) -> Result<()> {
        let previous = self.active.lock().await.clone();
        self.bus.notify(Notification::ViewSwitching { from: previous.clone(), to: record.id.clone() });
        debug!(from = ?previous, to = %record.id, "switch engine: switching");

        match self.ensure_view(record).await {
            Ok(()) => {
                *self.active.lock().await = Some(record.id.clone());
                self.bus.notify(Notification::ViewSwitched { from: previous, to: record.id.clone() });
                info!(account_id = %record.id, "switch engine: switched");
                Ok(())
            }
            Err(error) => {
                self.bus.notify(Notification::ViewSwitchFailed { from: previous, to: record.id.clone(), error: error.to_string() });
                warn!(account_id = %record.id, error = %error, "switch engine: switch failed, activeId unchanged");
                Err(error)
            }
        }
    }

    /// Releases a view's render surface. The runtime may outlive it — the
    /// Supervisor decides.
    pub async fn destroy_view(&self, id: &AccountId) {
        self.views.lock().await.remove(id);
        let mut active = self.active.lock().await;
        if active.as_ref() == Some(id) {
            *active = None;
        }
    }

    /// Debounced resize of the active view's drawable rectangle. Only the
    /// last call within the debounce window actually takes effect.
    pub async fn resize_active_to(&self, bounds: ViewBounds) {
        let generation = {
            let mut generation = self.resize_generation.lock().await;
            *generation += 1;
            *generation
        };
        sleep(self.resize_debounce).await;
        let mut current_generation = self.resize_generation.lock().await;
        if *current_generation != generation {
            // A newer resize request arrived during the debounce window;
            // let it win instead.
            return;
        }
        *current_generation = 0;
        drop(current_generation);
        *self.active_bounds.lock().await = Some(bounds);
    }

    pub async fn active_bounds(&self) -> Option<ViewBounds> {
        *self.active_bounds.lock().await
    }
}
