//! Applying a delete notification: removing a file or empty directory at a
//! destination-relative path, already validated by the forbidden-path
//! policy at decode time. Restricted to files and empty directories only —
//! the source left non-empty-directory deletion unspecified, and a
//! one-way link is the wrong place to guess at it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// What happened when a delete notification was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// A regular file was removed.
    FileRemoved,
    /// An empty directory was removed.
    EmptyDirRemoved,
    /// Nothing existed at the named path. Per the design, this is a
    /// warning, not an error — a redundant delete for an already-removed
    /// path is an expected consequence of re-emission.
    NotFound,
}

/// Failure applying a delete notification.
#[derive(Debug, Error)]
pub enum DeleteError {
    /// Could not inspect the target path.
    #[error("failed to inspect {path}: {source}")]
    Stat {
        /// Path that could not be inspected.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Could not remove the target file.
    #[error("failed to remove file {path}: {source}")]
    RemoveFile {
        /// File that could not be removed.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// Could not remove the target directory.
    #[error("failed to remove directory {path}: {source}")]
    RemoveDir {
        /// Directory that could not be removed.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The target exists but is neither a regular file nor a directory.
    #[error("{path} is neither a regular file nor a directory")]
    NeitherFileNorDir {
        /// The offending path.
        path: PathBuf,
    },
}

/// Removes the file or empty directory named by `rel_path` beneath
/// `dest_root`. `rel_path` must already have passed the forbidden-path
/// policy (decode enforces this for every [`protocol::DeletePacket`]).
pub fn apply(dest_root: &Path, rel_path: &Path) -> Result<DeleteOutcome, DeleteError> {
    let full = dest_root.join(rel_path);
    let meta = match fs::symlink_metadata(&full) {
        Ok(meta) => meta,
        Err(source) if source.kind() == io::ErrorKind::NotFound => {
            return Ok(DeleteOutcome::NotFound)
        }
        Err(source) => return Err(DeleteError::Stat { path: full, source }),
    };

    if meta.is_file() {
        fs::remove_file(&full).map_err(|source| DeleteError::RemoveFile {
            path: full.clone(),
            source,
        })?;
        Ok(DeleteOutcome::FileRemoved)
    } else if meta.is_dir() {
        fs::remove_dir(&full).map_err(|source| DeleteError::RemoveDir {
            path: full.clone(),
            source,
        })?;
        Ok(DeleteOutcome::EmptyDirRemoved)
    } else {
        Err(DeleteError::NeitherFileNorDir { path: full })
    }
}
