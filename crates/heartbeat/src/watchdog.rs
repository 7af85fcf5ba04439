//! The receiver's watchdog: a deadline shared with the analyzer (pushed
//! forward on every observed heartbeat) and a poller that escalates a
//! diagnostic when that deadline elapses without being pushed forward
//! again. Purely diagnostic — nothing here touches transfer state.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// A deadline written by the heartbeat analyzer and read by the watchdog
/// poller. The "single atomic or short-critical-section mutex" the design
/// notes call for in place of a broader lock over receiver state.
#[derive(Clone)]
pub struct SharedDeadline(Arc<Mutex<Instant>>);

impl SharedDeadline {
    /// Starts with the deadline already `timeout` past `now`, so a watchdog
    /// polling before the first heartbeat ever arrives does not immediately
    /// report staleness.
    #[must_use]
    pub fn new(now: Instant, timeout: Duration) -> Self {
        Self(Arc::new(Mutex::new(now + timeout)))
    }

    /// Pushes the deadline to `now + timeout`. Called by the analyzer each
    /// time a heartbeat is observed, per the design's `now + 1.5 * delay`
    /// reset rule (the `timeout` passed here is expected to already carry
    /// that multiplier).
    pub fn reset(&self, now: Instant, timeout: Duration) {
        *self.0.lock().expect("watchdog deadline mutex poisoned") = now + timeout;
    }

    /// Reads the current deadline.
    #[must_use]
    pub fn get(&self) -> Instant {
        *self.0.lock().expect("watchdog deadline mutex poisoned")
    }
}

/// What one watchdog poll discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Deadline not yet elapsed (or just caught up); nothing to report.
    Ok,
    /// The deadline elapsed for the first time since the last heartbeat.
    StaleLinkHint,
    /// The deadline has now been elapsed for `overdue_cycles` consecutive
    /// polls, and this is every tenth such cycle — escalate to a
    /// warning-level record.
    Warning {
        /// Consecutive overdue polls, including this one.
        overdue_cycles: u32,
    },
    /// Still overdue, but not a cycle the design calls for logging.
    StillOverdue {
        /// Consecutive overdue polls, including this one.
        overdue_cycles: u32,
    },
}

/// Tracks consecutive overdue polls against a [`SharedDeadline`]. Owned
/// exclusively by the watchdog thread — the analyzer never touches it.
#[derive(Debug, Default)]
pub struct Watchdog {
    overdue_cycles: u32,
}

impl Watchdog {
    /// Starts with zero consecutive overdue polls.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks `now` against `deadline`, updating (and possibly resetting)
    /// the overdue-cycle counter.
    pub fn poll(&mut self, now: Instant, deadline: Instant) -> PollOutcome {
        if now < deadline {
            self.overdue_cycles = 0;
            return PollOutcome::Ok;
        }
        self.overdue_cycles += 1;
        match self.overdue_cycles {
            1 => PollOutcome::StaleLinkHint,
            n if n % 10 == 0 => PollOutcome::Warning { overdue_cycles: n },
            n => PollOutcome::StillOverdue { overdue_cycles: n },
        }
    }
}
