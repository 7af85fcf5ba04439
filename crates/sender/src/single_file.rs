//! Splitting one local file into chunked datagrams and sending them under a
//! rate limiter. This is the innermost unit of work in both `send` mode and
//! the synchronization pass's transmit step — a pass simply calls this once
//! per selected file.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::net::{SocketAddr, UdpSocket};
use std::path::Path;
use std::time::UNIX_EPOCH;

use bandwidth::RateLimiter;
use protocol::{FileChunkPacket, Packet};

use crate::error::SendError;

/// What a completed single-file send produced, for the caller to fold back
/// into its own session and reference-tree bookkeeping.
#[derive(Debug, Clone, Copy)]
pub struct SendOutcome {
    /// Sequence number the next send in this session should start from.
    pub next_session_seq: i32,
    /// Number of chunks the file was split into.
    pub chunk_count: i32,
    /// Whole-file CRC32 carried on every chunk.
    pub crc32: u32,
    /// File size in bytes at the time of the read.
    pub file_size: u64,
    /// File modification time, as seconds since the UNIX epoch.
    pub file_mtime: u64,
}

/// Splits `source_path` into chunks and sends each as a datagram naming
/// `rel_path`, restarting `limiter`'s measurement window for this transfer.
/// `cached_crc`, if given, is trusted rather than recomputed — the
/// synchronization pass supplies it once per stable file rather than
/// rehashing on every pass.
pub fn send_file(
    socket: &UdpSocket,
    dest: SocketAddr,
    source_path: &Path,
    rel_path: &Path,
    limiter: &mut RateLimiter,
    session_id: i32,
    session_seq: i32,
    cached_crc: Option<u32>,
) -> Result<SendOutcome, SendError> {
    let mut file = File::open(source_path).map_err(|source| SendError::Open {
        path: source_path.to_path_buf(),
        source,
    })?;
    let metadata = file.metadata().map_err(|source| SendError::Open {
        path: source_path.to_path_buf(),
        source,
    })?;
    let file_size = metadata.len();
    let file_mtime = metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_secs());
    let crc32 = match cached_crc {
        Some(crc) => crc,
        None => checksums::crc32_file_handle(&mut file).map_err(|source| SendError::Checksum {
            path: source_path.to_path_buf(),
            source: checksums::ChecksumError::Io {
                path: source_path.to_path_buf(),
                source,
            },
        })?,
    };

    let name = to_wire_name(rel_path);
    let chunk_payload_max = FileChunkPacket::max_payload_len(&name).max(1) as u64;
    let chunk_count = file_size.div_ceil(chunk_payload_max).max(1) as i32;

    let mut seq = session_seq;
    limiter.restart();
    let mut buf = vec![0u8; chunk_payload_max as usize];
    for chunk_index in 0..chunk_count {
        let offset = chunk_index as u64 * chunk_payload_max;
        let len = chunk_payload_max.min(file_size.saturating_sub(offset)) as usize;
        file.seek(SeekFrom::Start(offset))
            .and_then(|_| file.read_exact(&mut buf[..len]))
            .map_err(|source| SendError::Read {
                path: source_path.to_path_buf(),
                source,
            })?;

        limiter.enforce();
        let packet = Packet::FileChunk(FileChunkPacket {
            session_id,
            session_seq: seq,
            chunk_index,
            chunk_count,
            file_size,
            file_mtime,
            crc32: crc32 as i32,
            offset,
            name: name.clone(),
            data: buf[..len].to_vec(),
        });
        let encoded = packet.encode();
        socket
            .send_to(&encoded, dest)
            .map_err(|source| SendError::Send { addr: dest, source })?;
        limiter.account(len);
        seq = seq.wrapping_add(1);
        tracing::debug!(
            path = %rel_path.display(),
            chunk_index,
            chunk_count,
            "sent chunk"
        );
    }

    tracing::info!(path = %rel_path.display(), %crc32, file_size, "file transmitted");
    Ok(SendOutcome {
        next_session_seq: seq,
        chunk_count,
        crc32,
        file_size,
        file_mtime,
    })
}

/// Renders a relative filesystem path as the forward-slash UTF-8 string the
/// wire format carries, independent of the host platform's separator.
pub(crate) fn to_wire_name(rel_path: &Path) -> String {
    rel_path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
