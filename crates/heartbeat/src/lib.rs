#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! The heartbeat liveness subsystem: the sender's side emits a monotone
//! session/sequence stream; the receiver's side folds observed beats into
//! loss/restart statistics and drives a watchdog that escalates a
//! diagnostic when beats stop arriving. Neither half ever touches transfer
//! state — this subsystem exists purely to give an operator on the high
//! side a signal that the low side is (or isn't) still alive, something a
//! unidirectional link otherwise provides no way to observe.

/// Folding observed heartbeats into loss/restart statistics.
pub mod analyzer;
/// Emitting a monotone session/sequence heartbeat stream.
pub mod emitter;
mod watchdog;

pub use analyzer::{Observation, Stats};
pub use emitter::{HeartbeatEmitter, HeartbeatTick};
pub use watchdog::{PollOutcome, SharedDeadline, Watchdog};
