#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! The BlindFTP wire protocol: a single fixed-width header shape shared by
//! all three packet kinds, and the forbidden-path policy applied to every
//! name carried on the wire.
//!
//! # Design
//!
//! The header never varies in width or field order across packet kinds —
//! this keeps the receive loop's hot path a single `Header::decode` call
//! before dispatch. Kinds that don't need a field (a delete has no chunk
//! geometry, a heartbeat has no file identity) repurpose it rather than
//! grow the header, which is why [`Packet::decode`] is the authority on
//! what each field means for a given `kind`, not the header alone:
//!
//! - **File chunk** (`kind=0`): every field carries its literal meaning.
//! - **Heartbeat** (`kind=10`): `chunk_index` carries the sender's
//!   monotone heartbeat sequence number, `session_seq` carries the
//!   inter-beat delay in seconds, and the name tail is absent — the
//!   diagnostic message occupies the data tail instead.
//! - **Delete** (`kind=16`): the destination-relative path occupies the
//!   name tail; there is no data tail.
//!
//! # Examples
//!
//! ```
//! use protocol::{FileChunkPacket, Packet};
//!
//! let packet = Packet::FileChunk(FileChunkPacket {
//!     session_id: 1_700_000_000,
//!     session_seq: 0,
//!     chunk_index: 0,
//!     chunk_count: 1,
//!     file_size: 5,
//!     file_mtime: 1_700_000_000,
//!     crc32: 0,
//!     offset: 0,
//!     name: "a.txt".to_string(),
//!     data: b"hello".to_vec(),
//! });
//! let encoded = packet.encode();
//! let decoded = Packet::decode(&encoded).unwrap();
//! assert_eq!(decoded, packet);
//! ```

mod error;
mod header;
mod path_policy;

pub use error::DecodeError;
pub use header::{PacketKind, HEADER_LEN, MAX_DATAGRAM, MAX_NAME_LEN};
pub use path_policy::{PathPolicyError, FORBIDDEN_EXTENSIONS};

use header::Header;

/// A fully decoded datagram, tagged by packet kind.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Packet {
    /// A slice of a file's bytes.
    FileChunk(FileChunkPacket),
    /// A liveness signal.
    Heartbeat(HeartbeatPacket),
    /// A request to remove a destination-relative path.
    Delete(DeletePacket),
}

/// A slice of a file's bytes, addressed by byte offset, carrying the whole
/// file's declared identity (size, mtime, CRC) so any single datagram is
/// self-describing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileChunkPacket {
    /// Identifies the sending session; changes when the sender restarts.
    pub session_id: i32,
    /// The sender's monotone per-session sequence number.
    pub session_seq: i32,
    /// This chunk's position among `chunk_count` total chunks.
    pub chunk_index: i32,
    /// Total number of chunks the whole file is split into.
    pub chunk_count: i32,
    /// The whole file's declared size in bytes.
    pub file_size: u64,
    /// The whole file's declared modification time.
    pub file_mtime: u64,
    /// The whole file's declared IEEE CRC32.
    pub crc32: i32,
    /// Byte offset of this chunk's data within the whole file.
    pub offset: u64,
    /// Destination-relative path of the file being sent.
    pub name: String,
    /// This chunk's payload bytes.
    pub data: Vec<u8>,
}

impl FileChunkPacket {
    /// The largest payload a chunk naming `name` may carry without
    /// exceeding [`MAX_DATAGRAM`].
    #[must_use]
    pub fn max_payload_len(name: &str) -> usize {
        MAX_DATAGRAM - HEADER_LEN - name.len()
    }
}

/// A liveness signal carrying the sender's session identity, its own
/// sequence number, the configured inter-beat delay, and a short
/// diagnostic message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HeartbeatPacket {
    /// Identifies the sending session; changes when the sender restarts.
    pub session_id: i32,
    /// The sender's monotone per-session heartbeat sequence number.
    pub seq: i32,
    /// Configured delay, in seconds, between heartbeats.
    pub delay_secs: i32,
    /// Short human-readable diagnostic message.
    pub message: String,
}

/// A request to remove a file or empty directory at a destination-relative
/// path.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeletePacket {
    /// Destination-relative path to remove.
    pub path: String,
}

impl Packet {
    /// Packs this packet into a single UDP datagram payload.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        match self {
            Self::FileChunk(chunk) => encode_file_chunk(chunk),
            Self::Heartbeat(heartbeat) => encode_heartbeat(heartbeat),
            Self::Delete(delete) => encode_delete(delete),
        }
    }

    /// Decodes a raw UDP datagram into a packet, applying every invariant
    /// from the wire-format decode path: header shape, UTF-8 name
    /// encoding, forbidden-path policy, and length consistency.
    pub fn decode(datagram: &[u8]) -> Result<Self, DecodeError> {
        let header = Header::decode(datagram)?;
        let tail = &datagram[HEADER_LEN..];
        match header.kind {
            PacketKind::FileChunk => decode_file_chunk(&header, tail).map(Self::FileChunk),
            PacketKind::Heartbeat => decode_heartbeat(&header, tail).map(Self::Heartbeat),
            PacketKind::Delete => decode_delete(&header, tail).map(Self::Delete),
        }
    }
}

fn encode_file_chunk(chunk: &FileChunkPacket) -> Vec<u8> {
    let header = Header {
        kind: PacketKind::FileChunk,
        name_len: chunk.name.len() as i32,
        data_len: chunk.data.len() as u64,
        offset: chunk.offset,
        session_id: chunk.session_id,
        session_seq: chunk.session_seq,
        chunk_index: chunk.chunk_index,
        chunk_count: chunk.chunk_count,
        file_size: chunk.file_size,
        file_mtime: chunk.file_mtime,
        crc32: chunk.crc32,
    };
    let mut buf = Vec::with_capacity(HEADER_LEN + chunk.name.len() + chunk.data.len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(chunk.name.as_bytes());
    buf.extend_from_slice(&chunk.data);
    buf
}

fn decode_file_chunk(header: &Header, tail: &[u8]) -> Result<FileChunkPacket, DecodeError> {
    let name_len = header.name_len as usize;
    if tail.len() < name_len {
        return Err(DecodeError::DataLenMismatch {
            declared: header.data_len,
            actual: tail.len().saturating_sub(name_len) as u64,
        });
    }
    let (name_bytes, data) = tail.split_at(name_len);
    let name = std::str::from_utf8(name_bytes)
        .map_err(|_| DecodeError::InvalidNameEncoding)?
        .to_string();
    path_policy::validate(&name)?;

    if !(0..header.chunk_count).contains(&header.chunk_index) {
        return Err(DecodeError::ChunkIndexOutOfRange {
            chunk_index: header.chunk_index,
            chunk_count: header.chunk_count,
        });
    }
    let end = header
        .offset
        .checked_add(header.data_len)
        .unwrap_or(u64::MAX);
    if end > header.file_size {
        return Err(DecodeError::OffsetBeyondFileSize {
            offset: header.offset,
            data_len: header.data_len,
            file_size: header.file_size,
        });
    }
    if data.len() as u64 != header.data_len {
        return Err(DecodeError::DataLenMismatch {
            declared: header.data_len,
            actual: data.len() as u64,
        });
    }

    Ok(FileChunkPacket {
        session_id: header.session_id,
        session_seq: header.session_seq,
        chunk_index: header.chunk_index,
        chunk_count: header.chunk_count,
        file_size: header.file_size,
        file_mtime: header.file_mtime,
        crc32: header.crc32,
        offset: header.offset,
        name,
        data: data.to_vec(),
    })
}

fn encode_heartbeat(heartbeat: &HeartbeatPacket) -> Vec<u8> {
    let header = Header {
        kind: PacketKind::Heartbeat,
        name_len: 0,
        data_len: heartbeat.message.len() as u64,
        offset: 0,
        session_id: heartbeat.session_id,
        session_seq: heartbeat.delay_secs,
        chunk_index: heartbeat.seq,
        chunk_count: 0,
        file_size: 0,
        file_mtime: 0,
        crc32: 0,
    };
    let mut buf = Vec::with_capacity(HEADER_LEN + heartbeat.message.len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(heartbeat.message.as_bytes());
    buf
}

fn decode_heartbeat(header: &Header, tail: &[u8]) -> Result<HeartbeatPacket, DecodeError> {
    if tail.len() as u64 != header.data_len {
        return Err(DecodeError::DataLenMismatch {
            declared: header.data_len,
            actual: tail.len() as u64,
        });
    }
    Ok(HeartbeatPacket {
        session_id: header.session_id,
        seq: header.chunk_index,
        delay_secs: header.session_seq,
        message: String::from_utf8_lossy(tail).into_owned(),
    })
}

fn encode_delete(delete: &DeletePacket) -> Vec<u8> {
    let header = Header {
        kind: PacketKind::Delete,
        name_len: delete.path.len() as i32,
        data_len: 0,
        offset: 0,
        session_id: 0,
        session_seq: 0,
        chunk_index: 0,
        chunk_count: 0,
        file_size: 0,
        file_mtime: 0,
        crc32: 0,
    };
    let mut buf = Vec::with_capacity(HEADER_LEN + delete.path.len());
    buf.extend_from_slice(&header.encode());
    buf.extend_from_slice(delete.path.as_bytes());
    buf
}

fn decode_delete(header: &Header, tail: &[u8]) -> Result<DeletePacket, DecodeError> {
    let name_len = header.name_len as usize;
    if tail.len() != name_len {
        return Err(DecodeError::DataLenMismatch {
            declared: header.data_len,
            actual: tail.len() as u64,
        });
    }
    let path = std::str::from_utf8(tail)
        .map_err(|_| DecodeError::InvalidNameEncoding)?
        .to_string();
    path_policy::validate(&path)?;
    Ok(DeletePacket { path })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chunk() -> FileChunkPacket {
        FileChunkPacket {
            session_id: 1_700_000_000,
            session_seq: 3,
            chunk_index: 1,
            chunk_count: 4,
            file_size: 200_000,
            file_mtime: 1_700_000_500,
            crc32: -559_038_737, // 0xDEADBEEF
            offset: 65_000,
            name: "docs/a.txt".to_string(),
            data: vec![0xAB; 1000],
        }
    }

    #[test]
    fn file_chunk_round_trips() {
        let packet = Packet::FileChunk(sample_chunk());
        let encoded = packet.encode();
        let decoded = Packet::decode(&encoded).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn heartbeat_round_trips() {
        let packet = Packet::Heartbeat(HeartbeatPacket {
            session_id: 1_700_000_000,
            seq: 42,
            delay_secs: 10,
            message: "alive".to_string(),
        });
        let encoded = packet.encode();
        let decoded = Packet::decode(&encoded).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn delete_round_trips() {
        let packet = Packet::Delete(DeletePacket {
            path: "old/stale.txt".to_string(),
        });
        let encoded = packet.encode();
        let decoded = Packet::decode(&encoded).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn empty_file_produces_single_zero_length_chunk() {
        let packet = Packet::FileChunk(FileChunkPacket {
            session_id: 1,
            session_seq: 0,
            chunk_index: 0,
            chunk_count: 1,
            file_size: 0,
            file_mtime: 0,
            crc32: 0,
            offset: 0,
            name: "empty.bin".to_string(),
            data: Vec::new(),
        });
        let encoded = packet.encode();
        let decoded = Packet::decode(&encoded).unwrap();
        assert_eq!(decoded, packet);
    }

    #[test]
    fn offset_beyond_file_size_is_rejected() {
        let mut chunk = sample_chunk();
        chunk.offset = chunk.file_size;
        chunk.data = vec![1, 2, 3];
        let encoded = Packet::FileChunk(chunk).encode();
        let err = Packet::decode(&encoded).unwrap_err();
        assert!(matches!(err, DecodeError::OffsetBeyondFileSize { .. }));
    }

    #[test]
    fn chunk_index_at_or_above_chunk_count_is_rejected() {
        let mut chunk = sample_chunk();
        chunk.chunk_index = chunk.chunk_count;
        let encoded = Packet::FileChunk(chunk).encode();
        let err = Packet::decode(&encoded).unwrap_err();
        assert!(matches!(err, DecodeError::ChunkIndexOutOfRange { .. }));
    }

    #[test]
    fn forbidden_path_is_rejected_for_file_chunk() {
        let mut chunk = sample_chunk();
        chunk.name = "../escape".to_string();
        let encoded = Packet::FileChunk(chunk).encode();
        let err = Packet::decode(&encoded).unwrap_err();
        assert!(matches!(err, DecodeError::ForbiddenPath(_)));
    }

    #[test]
    fn forbidden_path_is_rejected_for_delete() {
        let encoded = Packet::Delete(DeletePacket {
            path: "/etc/x".to_string(),
        })
        .encode();
        let err = Packet::decode(&encoded).unwrap_err();
        assert!(matches!(err, DecodeError::ForbiddenPath(_)));
    }

    #[test]
    fn invalid_utf8_name_is_rejected() {
        let mut chunk = sample_chunk();
        chunk.name = "x".to_string();
        let mut encoded = Packet::FileChunk(chunk).encode();
        // name_len is 1, so the single name byte sits right after the header.
        encoded[HEADER_LEN] = 0xFF;
        let err = Packet::decode(&encoded).unwrap_err();
        assert!(matches!(err, DecodeError::InvalidNameEncoding));
    }

    #[test]
    fn max_payload_len_accounts_for_header_and_name() {
        let max = FileChunkPacket::max_payload_len("docs/a.txt");
        assert_eq!(max, MAX_DATAGRAM - HEADER_LEN - "docs/a.txt".len());
    }

    #[test]
    fn filename_at_exactly_max_length_is_accepted() {
        let name = "a".repeat(MAX_NAME_LEN);
        let mut chunk = sample_chunk();
        chunk.name = name;
        let encoded = Packet::FileChunk(chunk).encode();
        assert!(Packet::decode(&encoded).is_ok());
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn arbitrary_well_formed_file_chunk_round_trips(
            name in "[a-zA-Z0-9_]{1,20}(/[a-zA-Z0-9_]{1,20}){0,3}",
            chunk_index in 0i32..50,
            extra_chunks in 1i32..50,
            data_len in 0usize..2000,
            offset_chunks in 0u64..50,
            session_id in i32::MIN..=i32::MAX,
            session_seq in i32::MIN..=i32::MAX,
            file_mtime in 0u64..4_000_000_000,
            crc32 in i32::MIN..=i32::MAX,
        ) {
            let chunk_count = chunk_index + extra_chunks;
            let data = vec![0xAB; data_len];
            let offset = offset_chunks * data_len as u64;
            let file_size = offset + data.len() as u64;
            let chunk = FileChunkPacket {
                session_id,
                session_seq,
                chunk_index,
                chunk_count,
                file_size,
                file_mtime,
                crc32,
                offset,
                name,
                data,
            };
            let encoded = Packet::FileChunk(chunk.clone()).encode();
            let decoded = Packet::decode(&encoded).unwrap();
            prop_assert_eq!(decoded, Packet::FileChunk(chunk));
        }

        #[test]
        fn offset_beyond_file_size_is_always_rejected(
            file_size in 0u64..10_000,
            overshoot in 1u64..10_000,
        ) {
            let chunk = FileChunkPacket {
                session_id: 1,
                session_seq: 0,
                chunk_index: 0,
                chunk_count: 1,
                file_size,
                file_mtime: 0,
                crc32: 0,
                offset: file_size,
                name: "a.txt".to_string(),
                data: vec![0u8; overshoot as usize],
            };
            let encoded = Packet::FileChunk(chunk).encode();
            let err = Packet::decode(&encoded).unwrap_err();
            prop_assert!(matches!(err, DecodeError::OffsetBeyondFileSize { .. }));
        }
    }
}
