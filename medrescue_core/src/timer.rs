//! Time sources, timer presentation and the session tick scheduler.
//!
//! Timers never count down by decrementing. Each tick recomputes the
//! remaining time from the wall-clock start timestamp, so a session that
//! was not ticked for a while (backgrounded, blocked on input) catches up
//! on the next tick without drift.

use crate::session::{ProtocolSession, Transition};
use crate::TimerRuntimeState;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::Serialize;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

/// Timers at or below this many seconds (but not expired) are urgent
pub const DEFAULT_URGENT_THRESHOLD_SECONDS: u32 = 30;

/// Source of the current time for a session
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;

    /// Wait for `duration` to pass
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Wall-clock time
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for simulations and tests
///
/// Clones share the same underlying time, so a handle kept outside a
/// session can move the session's clock. Sleeping advances the clock
/// instead of blocking.
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(Cell::new(start)),
        }
    }

    pub fn advance_seconds(&self, seconds: i64) {
        self.now.set(self.now.get() + ChronoDuration::seconds(seconds));
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.now.set(at);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        let step = ChronoDuration::from_std(duration).unwrap_or_else(|_| ChronoDuration::zero());
        self.now.set(self.now.get() + step);
    }
}

/// Seconds left on a timer at `now`, never below zero
pub fn remaining_at(state: &TimerRuntimeState, now: DateTime<Utc>) -> u32 {
    let elapsed = (now - state.started_at).num_seconds().max(0);
    let elapsed = u32::try_from(elapsed).unwrap_or(u32::MAX);
    state.duration_seconds.saturating_sub(elapsed)
}

/// Render seconds as `m:ss`
pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Display-ready snapshot of one timer
#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct TimerStatus {
    pub node_id: String,
    pub title: String,
    pub duration_seconds: u32,
    pub remaining_seconds: u32,
    pub running: bool,
    pub progress_percent: f64,
    pub is_urgent: bool,
    pub is_expired: bool,
    pub display: String,
}

impl TimerStatus {
    pub fn new(
        node_id: &str,
        title: &str,
        state: &TimerRuntimeState,
        urgent_threshold_seconds: u32,
    ) -> Self {
        let remaining = state.remaining_seconds;
        let progress_percent = if state.duration_seconds == 0 {
            0.0
        } else {
            f64::from(state.duration_seconds - remaining.min(state.duration_seconds))
                / f64::from(state.duration_seconds)
                * 100.0
        };

        Self {
            node_id: node_id.to_string(),
            title: title.to_string(),
            duration_seconds: state.duration_seconds,
            remaining_seconds: remaining,
            running: state.running,
            progress_percent,
            is_urgent: remaining > 0 && remaining <= urgent_threshold_seconds,
            is_expired: remaining == 0,
            display: format_clock(remaining),
        }
    }
}

/// Periodic driver for a session's timers
///
/// One ticker serves a whole session; individual timers do not schedule
/// anything themselves.
#[derive(Clone, Copy, Debug)]
pub struct Ticker {
    interval: Duration,
}

impl Ticker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Tick `session` every interval until `on_tick` returns false or every
    /// timer has run out or been paused
    ///
    /// Returns the number of ticks performed.
    pub fn drive<C, F>(&self, session: &mut ProtocolSession<'_, C>, mut on_tick: F) -> usize
    where
        C: Clock,
        F: FnMut(&ProtocolSession<'_, C>, Option<&Transition>) -> bool,
    {
        let mut ticks = 0;
        while session.has_active_countdown() {
            session.clock().sleep(self.interval);
            let transition = session.tick();
            ticks += 1;
            if !on_tick(&*session, transition.as_ref()) {
                break;
            }
        }
        ticks
    }
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(duration: u32, remaining: u32) -> TimerRuntimeState {
        TimerRuntimeState {
            duration_seconds: duration,
            remaining_seconds: remaining,
            running: true,
            started_at: Utc::now(),
            auto_advanced: false,
        }
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0), "0:00");
        assert_eq!(format_clock(65), "1:05");
        assert_eq!(format_clock(120), "2:00");
    }

    #[test]
    fn test_remaining_from_timestamps() {
        let clock = ManualClock::default();
        let mut s = state(120, 120);
        s.started_at = clock.now();

        clock.advance_seconds(45);
        assert_eq!(remaining_at(&s, clock.now()), 75);

        clock.advance_seconds(500);
        assert_eq!(remaining_at(&s, clock.now()), 0);
    }

    #[test]
    fn test_remaining_ignores_clock_going_backwards() {
        let clock = ManualClock::default();
        let mut s = state(60, 60);
        s.started_at = clock.now();
        clock.advance_seconds(-10);
        assert_eq!(remaining_at(&s, clock.now()), 60);
    }

    #[test]
    fn test_status_flags() {
        let fresh = TimerStatus::new("t", "Timer", &state(120, 120), 30);
        assert!(!fresh.is_urgent);
        assert!(!fresh.is_expired);
        assert_eq!(fresh.progress_percent, 0.0);

        let urgent = TimerStatus::new("t", "Timer", &state(120, 30), 30);
        assert!(urgent.is_urgent);
        assert_eq!(urgent.progress_percent, 75.0);
        assert_eq!(urgent.display, "0:30");

        let expired = TimerStatus::new("t", "Timer", &state(120, 0), 30);
        assert!(expired.is_expired);
        assert!(!expired.is_urgent);
        assert_eq!(expired.progress_percent, 100.0);
    }

    #[test]
    fn test_zero_duration_progress() {
        let status = TimerStatus::new("t", "Timer", &state(0, 0), 30);
        assert_eq!(status.progress_percent, 0.0);
    }

    #[test]
    fn test_manual_clock_sleep_advances() {
        let clock = ManualClock::default();
        let before = clock.now();
        clock.sleep(Duration::from_secs(3));
        assert_eq!((clock.now() - before).num_seconds(), 3);
    }
}
