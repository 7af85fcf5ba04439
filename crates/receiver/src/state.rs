//! The receiver's owned state for one destination directory: the
//! reassembly engine, the heartbeat loss/restart analyzer, and the
//! watchdog deadline they share. [`ReceiverState::handle_datagram`] is the
//! single entry point the receive loop calls per datagram; it is also the
//! seam this crate's tests drive directly, without a real socket.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use heartbeat::{HeartbeatTick, Observation, SharedDeadline, Stats as HeartbeatStats};
use protocol::{DecodeError, Packet};
use reassembly::{ChunkOutcome, FileIdentity, ReassemblyEngine, ReassemblyError};

use crate::delete::{self, DeleteError, DeleteOutcome};

/// Multiplier applied to a heartbeat's declared inter-beat delay to size
/// the watchdog's timeout — the design's `now + 1.5 * delay` rule.
pub const WATCHDOG_TIMEOUT_MULTIPLIER: f64 = 1.5;

/// What processing one datagram resulted in, for the caller to log at the
/// level `report` assigns it.
#[derive(Debug)]
pub enum DatagramOutcome {
    /// The datagram was a file chunk.
    Chunk(Result<ChunkOutcome, ReassemblyError>),
    /// The datagram was a heartbeat.
    Heartbeat(Observation),
    /// The datagram was a delete notification.
    Delete(Result<DeleteOutcome, DeleteError>),
    /// The datagram failed to decode and was discarded.
    Dropped(DecodeError),
}

/// One destination directory's live reassembly, heartbeat, and watchdog
/// state, mutated one datagram at a time by [`Self::handle_datagram`].
pub struct ReceiverState {
    engine: ReassemblyEngine,
    heartbeat_stats: HeartbeatStats,
    deadline: SharedDeadline,
}

impl ReceiverState {
    /// Builds fresh state publishing into `dest_root`, scratching
    /// in-progress files into `scratch_dir`, and seeding the watchdog
    /// timeout from `default_heartbeat_delay` until the first heartbeat
    /// arrives.
    #[must_use]
    pub fn new(
        dest_root: impl Into<PathBuf>,
        scratch_dir: impl Into<PathBuf>,
        default_heartbeat_delay: Duration,
    ) -> Self {
        let timeout = default_heartbeat_delay.mul_f64(WATCHDOG_TIMEOUT_MULTIPLIER);
        Self {
            engine: ReassemblyEngine::new(dest_root).with_scratch_dir(scratch_dir),
            heartbeat_stats: HeartbeatStats::new(),
            deadline: SharedDeadline::new(Instant::now(), timeout),
        }
    }

    /// A clone of the shared watchdog deadline, for the caller to hand to
    /// a separate watchdog-polling thread.
    #[must_use]
    pub fn watchdog_deadline(&self) -> SharedDeadline {
        self.deadline.clone()
    }

    /// The directory completed files are published into.
    #[must_use]
    pub fn dest_root(&self) -> &Path {
        self.engine.dest_root()
    }

    /// Number of files currently in progress.
    #[must_use]
    pub fn live_file_count(&self) -> usize {
        self.engine.live_file_count()
    }

    /// Total heartbeats inferred lost within the current session.
    #[must_use]
    pub fn lost_heartbeat_count(&self) -> u64 {
        self.heartbeat_stats.lost_count()
    }

    /// Decodes one raw UDP datagram and folds it into this state, applying
    /// the appropriate handler for its packet kind. Never panics on
    /// malformed input — a decode failure is reported, not propagated.
    pub fn handle_datagram(&mut self, datagram: &[u8]) -> DatagramOutcome {
        match Packet::decode(datagram) {
            Err(err) => DatagramOutcome::Dropped(err),
            Ok(Packet::FileChunk(chunk)) => {
                let identity = FileIdentity {
                    size: chunk.file_size,
                    mtime: chunk.file_mtime,
                    crc32: chunk.crc32 as u32,
                };
                let rel_path = Path::new(&chunk.name);
                let outcome = self.engine.handle_chunk(
                    rel_path,
                    identity,
                    chunk.chunk_index,
                    chunk.chunk_count,
                    chunk.offset,
                    &chunk.data,
                );
                DatagramOutcome::Chunk(outcome)
            }
            Ok(Packet::Heartbeat(beat)) => {
                let tick = HeartbeatTick {
                    session_id: beat.session_id,
                    seq: beat.seq,
                    delay_secs: beat.delay_secs,
                };
                DatagramOutcome::Heartbeat(self.observe_heartbeat(tick))
            }
            Ok(Packet::Delete(delete)) => {
                let rel_path = Path::new(&delete.path);
                self.engine.cancel(rel_path);
                DatagramOutcome::Delete(delete::apply(self.engine.dest_root(), rel_path))
            }
        }
    }

    fn observe_heartbeat(&mut self, tick: HeartbeatTick) -> Observation {
        let observation = self.heartbeat_stats.observe(tick.session_id, tick.seq);
        let delay = Duration::from_secs(tick.delay_secs.max(0) as u64);
        let timeout = delay.mul_f64(WATCHDOG_TIMEOUT_MULTIPLIER);
        self.deadline.reset(Instant::now(), timeout);
        observation
    }
}
