#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
//! The receive side of a one-way link: bind a single UDP socket, decode
//! every datagram that arrives, and fold it into reassembly or heartbeat
//! state. There is no handshake and nothing is ever sent back — the socket
//! this crate binds is read-only in spirit even though UDP can't enforce
//! that at the kernel level.

mod delete;
mod error;
mod report;
mod socket;
mod state;
mod watchdog;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub use error::ReceiverError;
pub use state::{DatagramOutcome, ReceiverState};

/// Everything the receive loop needs to start.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Local address to bind the receive socket to.
    pub bind_addr: SocketAddr,
    /// Directory completed files are published into.
    pub dest_root: PathBuf,
    /// Directory in-progress files are scratched into before publish.
    pub scratch_dir: PathBuf,
    /// The inter-heartbeat delay the sender is expected to use; the
    /// watchdog's timeout is derived from whatever delay the most recent
    /// heartbeat actually declared, but this seeds it before the first one
    /// arrives.
    pub default_heartbeat_delay: Duration,
}

/// Binds the socket, spawns the watchdog thread, and blocks forever
/// draining datagrams into [`ReceiverState`]. Returns only if the initial
/// bind fails — every error past that point is logged by [`report`] and the
/// loop continues.
pub fn run(config: ReceiverConfig) -> Result<(), ReceiverError> {
    let socket = socket::bind(config.bind_addr)?;
    let mut state = ReceiverState::new(
        config.dest_root,
        config.scratch_dir,
        config.default_heartbeat_delay,
    );
    tracing::info!(addr = %config.bind_addr, dest = %state.dest_root().display(), "receiver listening");

    let deadline = state.watchdog_deadline();
    let heartbeat_delay = config.default_heartbeat_delay;
    std::thread::Builder::new()
        .name("blindftp-watchdog".to_string())
        .spawn(move || watchdog::run(deadline, heartbeat_delay))
        .expect("failed to spawn watchdog thread");

    let mut buf = vec![0u8; protocol::MAX_DATAGRAM];
    loop {
        match socket.recv_from(&mut buf) {
            Ok((len, _peer)) => {
                let outcome = state.handle_datagram(&buf[..len]);
                report::log_outcome(&outcome);
            }
            Err(err) => {
                tracing::warn!(error = %err, "receive loop socket error");
            }
        }
    }
}
