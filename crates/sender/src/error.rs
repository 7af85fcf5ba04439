use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use thiserror::Error;

/// Failure sending a single file. A source-open failure is the one case the
/// synchronization pass treats as recoverable — it logs and moves on to the
/// next selected file rather than aborting the pass.
#[derive(Debug, Error)]
pub enum SendError {
    /// Could not open the source file.
    #[error("failed to open {path}: {source}")]
    Open {
        /// File that failed to open.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Could not read a chunk from the source file.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Could not compute the file's whole-content checksum.
    #[error("failed to checksum {path}: {source}")]
    Checksum {
        /// File that failed to checksum.
        path: PathBuf,
        /// Underlying checksum error.
        #[source]
        source: checksums::ChecksumError,
    },

    /// Could not send a chunk datagram to the destination.
    #[error("failed to send datagram to {addr}: {source}")]
    Send {
        /// Destination address the send was attempted against.
        addr: SocketAddr,
        /// Underlying I/O error.
        source: io::Error,
    },
}

/// Failure in the synchronization pass itself, outside of any single file's
/// send. Persistence failure aborts the pass after logging, per the
/// propagation policy; a scan failure does too, since a pass cannot diff
/// against a tree it could not build.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Could not scan the source directory.
    #[error(transparent)]
    Scan(#[from] reftree::ScanError),

    /// Could not load or save the reference document.
    #[error(transparent)]
    Persist(#[from] reftree::PersistError),
}
