//! Sliding-window crash counter: a window (default 5 minutes) tracks
//! crash timestamps per id.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Default crash window, default crash threshold, and default restart
/// delay.
pub const DEFAULT_CRASH_WINDOW: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_MAX_CRASH_COUNT: u32 = 3;
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(5);
pub const DEFAULT_HANG_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_HEALTH_TICK_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_LIVENESS_PROBE_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_RESTART_COOLDOWN: Duration = Duration::from_secs(1);

/// Per-instance crash timestamps, pruned to the configured window on every
/// observation.
#[derive(Debug, Clone)]
pub struct CrashWindow {
    window: Duration,
    timestamps: VecDeque<DateTime<Utc>>,
}

impl CrashWindow {
    pub fn new(window: Duration) -> Self {
        Self { window, timestamps: VecDeque::new() }
    }

    /// Record a crash at `now`, prune anything older than the window, and
    /// return the count remaining in-window (including this one).
    pub fn record(&mut self, now: DateTime<Utc>) -> u32 {
        self.timestamps.push_back(now);
        self.prune(now);
        self.timestamps.len() as u32
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        let cutoff = now - chrono::Duration::from_std(self.window).unwrap_or(chrono::Duration::zero());
        while let Some(front) = self.timestamps.front() {
            if *front < cutoff {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }

    /// An external reset — a user-initiated restart clears the window.
    pub fn reset(&mut self) {
        self.timestamps.clear();
    }

    pub fn count(&self) -> u32 {
        self.timestamps.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_crashes_within_the_window_are_all_counted() {
        let mut window = CrashWindow::new(Duration::from_secs(300));
        let t0 = Utc::now();
        assert_eq!(window.record(t0), 1);
        assert_eq!(window.record(t0 + chrono::Duration::seconds(10)), 2);
        assert_eq!(window.record(t0 + chrono::Duration::seconds(20)), 3);
    }

    #[test]
    fn crashes_outside_the_window_are_pruned() {
        let mut window = CrashWindow::new(Duration::from_secs(60));
        let t0 = Utc::now();
        window.record(t0);
        let count = window.record(t0 + chrono::Duration::seconds(120));
        assert_eq!(count, 1);
    }

    #[test]
    fn reset_clears_the_window() {
        let mut window = CrashWindow::new(Duration::from_secs(300));
        window.record(Utc::now());
        window.reset();
        assert_eq!(window.count(), 0);
    }
}
