//! One file's receiving state: a scratch-file backing store, written to at
//! arbitrary offsets as chunks arrive in whatever order the diode happens
//! to deliver them, and a bitmap tracking which chunk indices have landed.

use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use bitset::BitSet;
use tempfile::NamedTempFile;

use crate::error::ReassemblyError;

/// The declared identity of a file, carried by every chunk that names it.
/// Two chunks naming the same destination path but disagreeing on any of
/// these fields are for different versions of the file — the supersede
/// rule in [`crate::ReassemblyEngine::handle_chunk`] hinges on this.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileIdentity {
    /// Declared whole-file size in bytes.
    pub size: u64,
    /// Declared modification time.
    pub mtime: u64,
    /// Declared IEEE CRC32.
    pub crc32: u32,
}

/// Per-file receiving state: declared identity, chunk-completeness bitmap,
/// and a scratch file chunks are written into at their declared byte
/// offset. The scratch file is an anonymous-on-disk [`NamedTempFile`];
/// dropping a `ReceivingFile` (on supersede, on publish, or on process
/// exit) closes and unlinks it without any explicit cleanup code, which is
/// the "scoped acquisition" the design calls for.
pub struct ReceivingFile {
    identity: FileIdentity,
    bits: BitSet,
    scratch: NamedTempFile,
}

impl ReceivingFile {
    pub(crate) fn new(
        identity: FileIdentity,
        chunk_count: i32,
        scratch_dir: &Path,
    ) -> Result<Self, ReassemblyError> {
        let scratch =
            NamedTempFile::new_in(scratch_dir).map_err(|source| ReassemblyError::ScratchCreate {
                path: scratch_dir.to_path_buf(),
                source,
            })?;
        Ok(Self {
            identity,
            bits: BitSet::new(chunk_count.max(0) as usize),
            scratch,
        })
    }

    /// This record's declared file identity.
    #[must_use]
    pub const fn identity(&self) -> FileIdentity {
        self.identity
    }

    /// Whether `candidate` identifies a different version of this file than
    /// the one currently being received.
    #[must_use]
    pub fn is_superseded_by(&self, candidate: FileIdentity) -> bool {
        self.identity != candidate
    }

    /// Whether `chunk_index` has already been received.
    #[must_use]
    pub fn is_bit_set(&self, chunk_index: i32) -> bool {
        chunk_index >= 0 && self.bits.get(chunk_index as usize)
    }

    /// Whether every declared chunk has been received.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.bits.is_complete()
    }

    /// Number of distinct chunks received so far.
    #[must_use]
    pub const fn received_count(&self) -> usize {
        self.bits.nb_true()
    }

    /// Writes `data` at `offset` in the scratch file and marks
    /// `chunk_index` received. Callers are expected to have already
    /// checked `is_bit_set` and bounds — this never fails on a well-formed
    /// call, only on I/O error.
    pub(crate) fn accept_chunk(
        &mut self,
        chunk_index: i32,
        offset: u64,
        data: &[u8],
    ) -> Result<(), ReassemblyError> {
        let file = self.scratch.as_file_mut();
        file.seek(SeekFrom::Start(offset))
            .and_then(|_| file.write_all(data))
            .map_err(|source| ReassemblyError::ScratchWrite {
                path: self.scratch.path().to_path_buf(),
                source,
            })?;
        self.bits.set(chunk_index.max(0) as usize, true);
        Ok(())
    }

    pub(crate) fn scratch_file_mut(&mut self) -> &mut File {
        self.scratch.as_file_mut()
    }

    pub(crate) fn scratch_path(&self) -> &Path {
        self.scratch.path()
    }
}

impl std::fmt::Debug for ReceivingFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceivingFile")
            .field("identity", &self.identity)
            .field("received", &self.bits.nb_true())
            .field("chunk_count", &self.bits.len())
            .finish()
    }
}
