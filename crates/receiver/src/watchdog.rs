//! The watchdog thread: polls the shared deadline once a second and
//! escalates a diagnostic when it elapses, per §4.8's "first a stale-link
//! hint, then every tenth overdue cycle a warning" rule. Purely
//! diagnostic — never touches reassembly or heartbeat state.

use std::time::{Duration, Instant};

use heartbeat::{PollOutcome, SharedDeadline, Watchdog};

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Runs forever, polling `deadline` every second. On an overdue cycle that
/// warrants a log line, sleeps the remainder of `heartbeat_delay` before
/// resuming the 1-second cadence, so a stale link doesn't spam the log at
/// 1 Hz.
pub fn run(deadline: SharedDeadline, heartbeat_delay: Duration) -> ! {
    let mut watchdog = Watchdog::new();
    loop {
        std::thread::sleep(POLL_INTERVAL);
        let now = Instant::now();
        match watchdog.poll(now, deadline.get()) {
            PollOutcome::Ok | PollOutcome::StillOverdue { .. } => {}
            PollOutcome::StaleLinkHint => {
                tracing::warn!("no heartbeat received recently; link may be stale");
                std::thread::sleep(heartbeat_delay.saturating_sub(POLL_INTERVAL));
            }
            PollOutcome::Warning { overdue_cycles } => {
                tracing::warn!(overdue_cycles, "heartbeat still overdue");
                std::thread::sleep(heartbeat_delay.saturating_sub(POLL_INTERVAL));
            }
        }
    }
}
