use thiserror::Error;

use crate::path_policy::PathPolicyError;

/// Everything that can go wrong turning a raw UDP datagram into a [`crate::Packet`].
///
/// A `DecodeError` never indicates a bug in the sender's own traffic; on a
/// shared or noisy diode link it is expected to occur for datagrams that
/// belong to other traffic entirely. Callers should log and discard, never
/// treat it as fatal.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum DecodeError {
    /// The datagram is shorter than the fixed header.
    #[error("datagram too short: {len} bytes")]
    TooShort {
        /// Actual length of the datagram in bytes.
        len: usize,
    },

    /// The header's `kind` field did not match any known packet kind.
    #[error("unknown packet kind {0}")]
    UnknownKind(i32),

    /// The declared name length exceeds [`crate::MAX_NAME_LEN`].
    #[error("name length {len} exceeds the maximum")]
    NameTooLong {
        /// Declared name length, clamped to non-negative.
        len: usize,
    },

    /// The name tail was not valid UTF-8.
    #[error("name is not valid UTF-8")]
    InvalidNameEncoding,

    /// The decoded name or path failed the forbidden-path policy.
    #[error("name rejected by path policy: {0}")]
    ForbiddenPath(#[from] PathPolicyError),

    /// This chunk's offset and length would write past the declared file size.
    #[error("offset {offset} + data_len {data_len} exceeds declared file_size {file_size}")]
    OffsetBeyondFileSize {
        /// Byte offset declared on the chunk.
        offset: u64,
        /// Declared payload length.
        data_len: u64,
        /// Declared whole-file size.
        file_size: u64,
    },

    /// The declared data length didn't match the bytes actually present.
    #[error("declared data_len {declared} does not match {actual} remaining datagram bytes")]
    DataLenMismatch {
        /// Length declared in the header.
        declared: u64,
        /// Bytes actually remaining in the datagram.
        actual: u64,
    },

    /// The chunk index is not within `0..chunk_count`.
    #[error("chunk_index {chunk_index} is out of range for chunk_count {chunk_count}")]
    ChunkIndexOutOfRange {
        /// The out-of-range chunk index.
        chunk_index: i32,
        /// Declared total chunk count.
        chunk_count: i32,
    },
}
