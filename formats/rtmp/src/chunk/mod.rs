use errors::{ChunkMessageError, ChunkMessageResult};

pub mod consts;
pub mod errors;
pub mod reader;
pub mod writer;

pub type Csid = u32;

///! @see: 5.3.1. Chunk Format
/// +--------------+----------------+--------------------+--------------+
/// | Basic Header | Message Header | Extended Timestamp |  Chunk Data  |
/// +--------------+----------------+--------------------+--------------+
/// |                                                    |
/// |<------------------- Chunk Header ----------------->|
///
///! @see: 5.3.1.1. Chunk Basic Header
///! 1, 2 or 3 bytes; the low six bits of the first byte select the encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkBasicHeader {
    pub fmt: u8, // 2 bits
    pub chunk_stream_id: Csid,
}

impl ChunkBasicHeader {
    pub fn new(fmt: u8, chunk_stream_id: Csid) -> ChunkMessageResult<Self> {
        if !(consts::MIN_CSID..=consts::MAX_CSID).contains(&chunk_stream_id) {
            return Err(ChunkMessageError::InvalidBasicHeader(format!(
                "csid out of range: {}",
                chunk_stream_id
            )));
        }
        Ok(Self {
            fmt,
            chunk_stream_id,
        })
    }

    /// On-wire length of this basic header in bytes.
    pub fn encoded_len(&self) -> usize {
        match self.chunk_stream_id {
            2..=63 => 1,
            64..=319 => 2,
            _ => 3,
        }
    }
}

/// The fully materialized header of a reassembled message, with every
/// compressed field resolved against the chunk stream's prior state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub chunk_stream_id: Csid,
    /// Effective timestamp in milliseconds; wraps with the u32 clock.
    pub timestamp: u32,
    pub message_length: u32,
    pub message_type_id: u8,
    pub message_stream_id: u32,
    /// Whether an extended 32-bit timestamp was on the wire; sticky across
    /// fmt-3 chunks of the same message.
    pub extended_timestamp: bool,
}
