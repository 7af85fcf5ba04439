use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure acquiring or writing a receiving file's scratch backing store.
#[derive(Debug, Error)]
pub enum ReassemblyError {
    /// Could not create a scratch file to stage an incoming file's chunks.
    #[error("failed to create scratch file in {path}: {source}")]
    ScratchCreate {
        /// Scratch directory the file could not be created in.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Could not write an incoming chunk to its scratch file.
    #[error("failed to write chunk to scratch file for {path}: {source}")]
    ScratchWrite {
        /// Destination-relative path of the file being received.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Publishing a completed file failed.
    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Failure during the publish (commit) step: streaming the scratch file to
/// its destination, verifying size and CRC, and applying the declared
/// mtime.
#[derive(Debug, Error)]
pub enum PublishError {
    /// Could not create a destination ancestor directory.
    #[error("failed to create destination directory {path}: {source}")]
    CreateDir {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A destination ancestor component was a non-directory file.
    #[error("failed to replace non-directory ancestor {path}: {source}")]
    ReplaceAncestor {
        /// The conflicting ancestor path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Could not rewind the scratch file before copying it to its
    /// destination.
    #[error("failed to seek scratch file for {path}: {source}")]
    SeekScratch {
        /// Destination-relative path being published.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Could not write the destination file's bytes.
    #[error("failed to write destination file {path}: {source}")]
    WriteDestination {
        /// Destination path being written.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Could not apply the declared mtime to the published file.
    #[error("failed to set mtime on {path}: {source}")]
    SetMtime {
        /// Destination path whose mtime could not be set.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The published file's size did not match the declared `file_size`.
    #[error("size mismatch publishing {path}: declared {declared}, actual {actual}")]
    SizeMismatch {
        /// Destination-relative path being published.
        path: PathBuf,
        /// Declared file size.
        declared: u64,
        /// Actual bytes written.
        actual: u64,
    },

    /// The published file's CRC32 did not match the declared `crc32`.
    #[error("CRC mismatch publishing {path}: declared {declared:#010x}, actual {actual:#010x}")]
    CrcMismatch {
        /// Destination-relative path being published.
        path: PathBuf,
        /// Declared CRC32.
        declared: u32,
        /// Actual CRC32 computed while copying.
        actual: u32,
    },
}
