#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Rate limiter enforcing a byte-per-second ceiling via measured throughput
//! and micro-sleeps, as used by the sender's synchronization loop and
//! single-file send to honor `--rate-kbps`.
//!
//! Unlike a token-bucket limiter, [`RateLimiter`] tracks only a start
//! instant and a cumulative byte count for the current transfer; `enforce`
//! sleeps in small increments until the measured throughput since `restart`
//! drops back under the ceiling. This mirrors the source tool's behavior of
//! measuring instantaneous throughput rather than maintaining a debt
//! balance, which keeps bursts short without needing burst-size
//! configuration.

use std::time::{Duration, Instant};

/// Granularity of the blocking sleep `enforce` performs while throttling.
pub const SLEEP_INCREMENT: Duration = Duration::from_millis(10);

/// Enforces a configured bytes-per-second ceiling over a transfer.
#[derive(Debug)]
pub struct RateLimiter {
    ceiling_bytes_per_sec: u64,
    start: Instant,
    bytes_sent: u64,
    #[cfg(any(test, feature = "test-support"))]
    recorded_sleeps: Vec<Duration>,
}

impl RateLimiter {
    /// Builds a limiter from a ceiling already expressed in bytes/second.
    /// A ceiling of `0` disables throttling entirely.
    #[must_use]
    pub fn from_bytes_per_sec(ceiling_bytes_per_sec: u64) -> Self {
        Self {
            ceiling_bytes_per_sec,
            start: Instant::now(),
            bytes_sent: 0,
            #[cfg(any(test, feature = "test-support"))]
            recorded_sleeps: Vec::new(),
        }
    }

    /// Builds a limiter from a ceiling expressed in kilobits/second, the
    /// unit `--rate-kbps` is specified in. Converted with the standard
    /// `kbps * 1000 / 8` to bytes/second.
    #[must_use]
    pub fn from_kbps(kbps: u64) -> Self {
        Self::from_bytes_per_sec(kbps.saturating_mul(1000) / 8)
    }

    /// The configured ceiling, in bytes/second.
    #[inline]
    #[must_use]
    pub const fn ceiling_bytes_per_sec(&self) -> u64 {
        self.ceiling_bytes_per_sec
    }

    /// Accounts `bytes` as sent toward this transfer's running total. Call
    /// once per chunk, right after a successful `sendto`.
    pub fn account(&mut self, bytes: usize) {
        self.bytes_sent = self.bytes_sent.saturating_add(bytes as u64);
    }

    /// Blocks in [`SLEEP_INCREMENT`] steps while the measured throughput
    /// since the last `restart` exceeds the configured ceiling. A ceiling
    /// of `0` never blocks.
    pub fn enforce(&mut self) {
        if self.ceiling_bytes_per_sec == 0 {
            return;
        }
        loop {
            let elapsed = self.start.elapsed();
            let allowed = (elapsed.as_secs_f64() * self.ceiling_bytes_per_sec as f64) as u64;
            if self.bytes_sent <= allowed {
                break;
            }
            self.sleep(SLEEP_INCREMENT);
        }
    }

    /// Zeroes the byte accumulator and resets the measurement start to now.
    /// Called at the start of each single-file send so unrelated transfers
    /// do not share throughput history.
    pub fn restart(&mut self) {
        self.bytes_sent = 0;
        self.start = Instant::now();
    }

    #[cfg(not(any(test, feature = "test-support")))]
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }

    #[cfg(any(test, feature = "test-support"))]
    fn sleep(&mut self, duration: Duration) {
        self.recorded_sleeps.push(duration);
        // Advance the virtual clock so elapsed-time math in `enforce`
        // converges without a real sleep, keeping unit tests fast.
        self.start = self.start.checked_sub(duration).unwrap_or(self.start);
    }

    /// Number of times `enforce` has slept since construction, for
    /// assertions in tests built against the virtual clock.
    #[cfg(any(test, feature = "test-support"))]
    #[must_use]
    pub fn recorded_sleep_count(&self) -> usize {
        self.recorded_sleeps.len()
    }
}
