//! Mapping a processed datagram's outcome to the `tracing` level the
//! design assigns it (§4.10): nothing a non-fatal `Result::Err` carries is
//! ever dropped silently on the floor.

use heartbeat::Observation;
use reassembly::ChunkOutcome;

use crate::delete::DeleteOutcome;
use crate::state::DatagramOutcome;

/// Logs `outcome` at the level the design assigns to it.
pub fn log_outcome(outcome: &DatagramOutcome) {
    match outcome {
        DatagramOutcome::Chunk(Ok(chunk)) => log_chunk_outcome(chunk),
        DatagramOutcome::Chunk(Err(err)) => {
            tracing::error!(error = %err, "reassembly failure");
        }
        DatagramOutcome::Heartbeat(observation) => log_heartbeat(*observation),
        DatagramOutcome::Delete(Ok(DeleteOutcome::NotFound)) => {
            tracing::warn!("delete target did not exist");
        }
        DatagramOutcome::Delete(Ok(outcome)) => {
            tracing::info!(?outcome, "delete applied");
        }
        DatagramOutcome::Delete(Err(err)) => {
            tracing::error!(error = %err, "delete failed");
        }
        DatagramOutcome::Dropped(err) => {
            tracing::warn!(error = %err, "dropped malformed datagram");
        }
    }
}

fn log_chunk_outcome(outcome: &ChunkOutcome) {
    match outcome {
        ChunkOutcome::Started => tracing::info!("new receiving file started"),
        ChunkOutcome::Superseded => {
            tracing::info!("receiving file superseded by a new version mid-transfer");
        }
        ChunkOutcome::Published(path) => {
            tracing::info!(path = %path.display(), "file published");
        }
        ChunkOutcome::OutOfBounds => {
            tracing::warn!("chunk offset+len exceeded declared file size; dropped");
        }
        ChunkOutcome::Accepted | ChunkOutcome::Duplicate | ChunkOutcome::SkippedAlreadyPresent => {
            tracing::debug!(?outcome, "chunk processed");
        }
    }
}

fn log_heartbeat(observation: Observation) {
    match observation {
        Observation::Established => tracing::info!("reception (re)started"),
        Observation::CleanRestart => tracing::info!("sender session restarted cleanly"),
        Observation::ReceivedTooLate { first_seq } => {
            tracing::warn!(first_seq, "received-too-late, lost seq packets");
        }
        Observation::Loss { lost } => tracing::warn!(lost, "lost heartbeats"),
        Observation::InSequence => tracing::debug!("heartbeat in sequence"),
    }
}
