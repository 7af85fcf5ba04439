#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Streaming IEEE CRC32 over a file or an in-memory buffer.
//!
//! BlindFTP never holds a whole file in memory to checksum it: both the
//! single-file sender (computing the header CRC before chunking) and the
//! reassembly engine (verifying a completed scratch file before publication)
//! stream a file in fixed-size blocks through a running [`crc32fast::Hasher`].

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

/// Size of the read buffer used when streaming a file through the hasher.
pub const STREAM_BLOCK: usize = 16 * 1024;

/// Errors surfaced by the file-reading checksum helpers.
#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
    /// Opening or reading the file failed.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that failed to open or read.
        path: std::path::PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Computes the IEEE CRC32 of an entire file by streaming it in
/// [`STREAM_BLOCK`]-sized reads. Leaves the file's cursor at EOF.
pub fn crc32_file(path: &Path) -> Result<u32, ChecksumError> {
    let mut file = File::open(path).map_err(|source| ChecksumError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    crc32_reader(&mut file).map_err(|source| ChecksumError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Computes the IEEE CRC32 of an already-open file, starting from its
/// current position and reading to EOF.
pub fn crc32_reader<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut hasher = crc32fast::Hasher::new();
    let mut buf = [0u8; STREAM_BLOCK];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

/// Computes the IEEE CRC32 of an in-memory buffer in one call.
#[must_use]
pub fn crc32_bytes(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Incremental CRC32 accumulator, for callers that read a file's bytes for
/// another purpose (e.g. chunking) and want to fold the CRC in as they go
/// rather than reading the file a second time.
#[derive(Default)]
pub struct RollingCrc32 {
    hasher: crc32fast::Hasher,
}

impl RollingCrc32 {
    /// Starts a fresh accumulator with no bytes folded in yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds `data` into the running checksum.
    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    /// Consumes the accumulator and returns the final CRC32.
    #[must_use]
    pub fn finalize(self) -> u32 {
        self.hasher.finalize()
    }
}

/// Streams `reader` from its current position to EOF in
/// [`STREAM_BLOCK`]-sized reads, writing each block to `sink` and folding it
/// into a running CRC32. Used by the reassembly engine's publish step, which
/// must copy the scratch file to its destination and verify its CRC in the
/// same pass rather than reading the data twice.
pub fn copy_with_crc32<R: Read, W: io::Write>(reader: &mut R, sink: &mut W) -> io::Result<(u64, u32)> {
    let mut hasher = crc32fast::Hasher::new();
    let mut buf = [0u8; STREAM_BLOCK];
    let mut total: u64 = 0;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        sink.write_all(&buf[..n])?;
        total += n as u64;
    }
    Ok((total, hasher.finalize()))
}

/// Seeks `file` to the start before streaming it through [`crc32_reader`].
/// Used when the sender has already opened the file for reading its chunks
/// and wants the CRC without opening a second handle.
pub fn crc32_file_handle(file: &mut File) -> io::Result<u32> {
    file.seek(SeekFrom::Start(0))?;
    crc32_reader(file)
}
