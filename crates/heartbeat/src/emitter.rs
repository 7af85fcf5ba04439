//! The sender's half of the heartbeat subsystem: a session identity fixed
//! at construction and a monotone sequence counter, ticked once per emitted
//! datagram.

use std::time::Duration;

/// One heartbeat's payload: session identity, this beat's sequence number,
/// and the configured inter-beat delay (carried on the wire so the
/// receiver's watchdog can size its own timeout without separate
/// configuration).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatTick {
    /// Identifies the emitting session.
    pub session_id: i32,
    /// This beat's monotone sequence number.
    pub seq: i32,
    /// Configured delay, in seconds, until the next beat.
    pub delay_secs: i32,
}

/// Emits a monotone sequence of heartbeat ticks for a single sender
/// lifetime. `session_id` is fixed at construction (the spec identifies a
/// session by the sender's start time); `seq` increments once per call to
/// [`Self::tick`].
#[derive(Debug)]
pub struct HeartbeatEmitter {
    session_id: i32,
    seq: i32,
    delay: Duration,
}

impl HeartbeatEmitter {
    /// Starts a new session identified by `session_id` (conventionally the
    /// current UNIX time in seconds), emitting ticks `delay` apart.
    #[must_use]
    pub const fn new(session_id: i32, delay: Duration) -> Self {
        Self {
            session_id,
            seq: 0,
            delay,
        }
    }

    /// This emitter's fixed session identity.
    #[must_use]
    pub const fn session_id(&self) -> i32 {
        self.session_id
    }

    /// The configured inter-beat delay.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns the next tick to emit and advances the sequence counter.
    pub fn tick(&mut self) -> HeartbeatTick {
        let tick = HeartbeatTick {
            session_id: self.session_id,
            seq: self.seq,
            delay_secs: self.delay.as_secs() as i32,
        };
        self.seq = self.seq.wrapping_add(1);
        tick
    }
}
