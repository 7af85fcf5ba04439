#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
//! The send side of a one-way link: single-file chunked transmission, the
//! directory synchronization loop built on top of it, and the heartbeat
//! emitter that runs alongside either mode.
//!
//! Unlike the receiver, the sender never binds to a fixed address — it
//! only needs an ephemeral local port to originate datagrams from, since
//! nothing is ever read back.

pub mod error;
pub mod heartbeat_loop;
pub mod pass;
pub mod single_file;
pub mod sync_loop;

use std::io;
use std::net::UdpSocket;

pub use error::{SendError, SyncError};
pub use pass::{PassConfig, PassOutcome, MIN_TRANSMIT_DELAY};
pub use single_file::{send_file, SendOutcome};

/// Binds an ephemeral local UDP socket suitable for originating datagrams.
/// The sender never reads from this socket; the link is unidirectional by
/// construction even though nothing at the kernel level enforces that.
pub fn bind_outbound() -> io::Result<UdpSocket> {
    UdpSocket::bind("0.0.0.0:0")
}

/// Single-file send mode: transmits one local file under a fresh rate
/// limiter and a session of its own, starting sequence numbers at zero.
pub fn send_single_file(
    socket: &UdpSocket,
    dest: std::net::SocketAddr,
    source_path: &std::path::Path,
    rel_path: &std::path::Path,
    rate_kbps: u64,
    session_id: i32,
) -> Result<SendOutcome, SendError> {
    let mut limiter = bandwidth::RateLimiter::from_kbps(rate_kbps);
    let outcome = single_file::send_file(
        socket,
        dest,
        source_path,
        rel_path,
        &mut limiter,
        session_id,
        0,
        None,
    )?;
    tracing::info!(
        path = %rel_path.display(),
        chunk_count = outcome.chunk_count,
        file_size = outcome.file_size,
        "single-file send complete"
    );
    Ok(outcome)
}
