use std::io;
use std::net::SocketAddr;

use thiserror::Error;

/// Fatal receiver startup failures. Everything past a successful bind is
/// logged and absorbed by the receive loop itself — see `report` — rather
/// than surfaced as an error, per the design's "the loop never terminates
/// on a bad datagram or socket error" requirement.
#[derive(Debug, Error)]
pub enum ReceiverError {
    /// Could not bind the receive socket.
    #[error("failed to bind UDP socket on {addr}: {source}")]
    Bind {
        /// Address that failed to bind.
        addr: SocketAddr,
        /// Underlying I/O error.
        source: io::Error,
    },
}
