//! The outer synchronization loop: repeated passes, paced by `pause`, until
//! either a bounded pass count is reached or every tracked file has been
//! emitted past the redundancy threshold.

use std::time::Duration;

use bandwidth::RateLimiter;
use reftree::ReferenceTree;

use crate::error::SyncError;
use crate::pass::{self, PassConfig};

/// Runs passes until termination, as configured. Returns once the loop
/// condition is met; the caller owns deciding whether that should end the
/// process.
pub fn run(
    tree: &mut ReferenceTree,
    socket: &std::net::UdpSocket,
    limiter: &mut RateLimiter,
    config: &PassConfig,
    session_seq: &mut i32,
    pause: Duration,
    loop_count: Option<u32>,
) -> Result<(), SyncError> {
    let mut passes_run: u32 = 0;
    loop {
        let outcome = pass::run_pass(tree, socket, limiter, config, session_seq)?;
        passes_run += 1;

        let done = match loop_count {
            Some(bound) => passes_run >= bound,
            None => outcome.min_redundancy_achieved,
        };
        if done {
            return Ok(());
        }
        std::thread::sleep(pause);
    }
}
