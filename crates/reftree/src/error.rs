use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure walking the source tree during a synchronization pass.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Could not walk the source tree.
    #[error("failed to walk {path}: {source}")]
    Walk {
        /// Root path the walk started from.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
}

/// Failure loading or saving the persisted reference document.
#[derive(Debug, Error)]
pub enum PersistError {
    /// Could not read the reference document.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Document path that failed to read.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Could not write the reference document.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Document path that failed to write.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Could not rename the previous document to its backup suffix.
    #[error("failed to rename {from} to {to}: {source}")]
    Rename {
        /// Original document path.
        from: PathBuf,
        /// Backup path it could not be renamed to.
        to: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The document's contents did not parse as the expected XML shape.
    #[error("malformed reference document at {path}: {source}")]
    Malformed {
        /// Document path that failed to parse.
        path: PathBuf,
        /// Underlying XML deserialization error.
        source: quick_xml::DeError,
    },

    /// Could not encode the in-memory tree as XML.
    #[error("failed to encode reference document as XML: {0}")]
    Encode(#[from] quick_xml::SeError),
}

/// Failure preparing or applying a [`crate::reset::ResetSelector`].
#[derive(Debug, Error)]
pub enum ResetError {
    /// The supplied regular expression failed to compile.
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// Scanning the comparison tree (`--against`) failed.
    #[error(transparent)]
    Scan(#[from] ScanError),
}
