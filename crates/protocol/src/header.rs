use crate::error::DecodeError;

/// Width in bytes of the fixed packet header, before the variable name and
/// payload tail.
///
/// `kind(4) + name_len(4) + data_len(8) + offset(8) + session_id(4) +
/// session_seq(4) + chunk_index(4) + chunk_count(4) + file_size(8) +
/// file_mtime(8) + crc32(4)`.
pub const HEADER_LEN: usize = 4 + 4 + 8 + 8 + 4 + 4 + 4 + 4 + 8 + 8 + 4;

/// Largest UDP datagram BlindFTP will ever send or accept.
pub const MAX_DATAGRAM: usize = 65500;

/// Largest UTF-8 byte length of a destination-relative name tail.
pub const MAX_NAME_LEN: usize = 1024;

/// The three packet kinds carried on the wire, tagged by the `kind` field.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PacketKind {
    /// A slice of a file's bytes (wire value `0`).
    FileChunk,
    /// A liveness signal (wire value `10`).
    Heartbeat,
    /// A request to remove a path (wire value `16`).
    Delete,
}

impl PacketKind {
    /// This kind's numeric tag on the wire.
    #[must_use]
    pub const fn wire_value(self) -> i32 {
        match self {
            Self::FileChunk => 0,
            Self::Heartbeat => 10,
            Self::Delete => 16,
        }
    }

    pub(crate) fn from_wire_value(value: i32) -> Result<Self, DecodeError> {
        match value {
            0 => Ok(Self::FileChunk),
            10 => Ok(Self::Heartbeat),
            16 => Ok(Self::Delete),
            other => Err(DecodeError::UnknownKind(other)),
        }
    }
}

/// The fixed header, unpacked into named fields. Field reuse across packet
/// kinds (documented at each accessor site in `lib.rs`) keeps the wire
/// format a single fixed shape for all three kinds, per the design's
/// "stateless per datagram" requirement.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Header {
    pub kind: PacketKind,
    pub name_len: i32,
    pub data_len: u64,
    pub offset: u64,
    pub session_id: i32,
    pub session_seq: i32,
    pub chunk_index: i32,
    pub chunk_count: i32,
    pub file_size: u64,
    pub file_mtime: u64,
    pub crc32: i32,
}

impl Header {
    pub(crate) fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        let mut w = Writer::new(&mut buf);
        w.put_i32(self.kind.wire_value());
        w.put_i32(self.name_len);
        w.put_u64(self.data_len);
        w.put_u64(self.offset);
        w.put_i32(self.session_id);
        w.put_i32(self.session_seq);
        w.put_i32(self.chunk_index);
        w.put_i32(self.chunk_count);
        w.put_u64(self.file_size);
        w.put_u64(self.file_mtime);
        w.put_i32(self.crc32);
        buf
    }

    pub(crate) fn decode(datagram: &[u8]) -> Result<Self, DecodeError> {
        if datagram.len() < HEADER_LEN {
            return Err(DecodeError::TooShort {
                len: datagram.len(),
            });
        }
        let mut r = Reader::new(&datagram[..HEADER_LEN]);
        let kind = PacketKind::from_wire_value(r.get_i32())?;
        let name_len = r.get_i32();
        let data_len = r.get_u64();
        let offset = r.get_u64();
        let session_id = r.get_i32();
        let session_seq = r.get_i32();
        let chunk_index = r.get_i32();
        let chunk_count = r.get_i32();
        let file_size = r.get_u64();
        let file_mtime = r.get_u64();
        let crc32 = r.get_i32();
        if !(0..=MAX_NAME_LEN as i32).contains(&name_len) {
            return Err(DecodeError::NameTooLong {
                len: name_len.max(0) as usize,
            });
        }
        Ok(Self {
            kind,
            name_len,
            data_len,
            offset,
            session_id,
            session_seq,
            chunk_index,
            chunk_count,
            file_size,
            file_mtime,
            crc32,
        })
    }
}

struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn put_i32(&mut self, v: i32) {
        self.buf[self.pos..self.pos + 4].copy_from_slice(&v.to_be_bytes());
        self.pos += 4;
    }

    fn put_u64(&mut self, v: u64) {
        self.buf[self.pos..self.pos + 8].copy_from_slice(&v.to_be_bytes());
        self.pos += 8;
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn get_i32(&mut self) -> i32 {
        let v = i32::from_be_bytes(self.buf[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        v
    }

    fn get_u64(&mut self) -> u64 {
        let v = u64::from_be_bytes(self.buf[self.pos..self.pos + 8].try_into().unwrap());
        self.pos += 8;
        v
    }
}
