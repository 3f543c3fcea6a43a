use std::{
    cmp::min,
    collections::HashMap,
    io::{Cursor, Read},
};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use tokio_util::bytes::{Buf, BytesMut};

use crate::message::{RtmpMessage, RtmpMessageBody};

use super::{
    Csid, MessageHeader,
    consts::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_PACKET_SIZE, MAX_TIMESTAMP},
    errors::{ChunkMessageError, ChunkMessageResult},
};

/// The in-flight reassembly of one message on one chunk stream.
#[derive(Debug)]
pub struct ChunkPayload {
    payload: BytesMut,
    remaining: usize,
}

impl ChunkPayload {
    fn new(total: usize) -> Self {
        Self {
            payload: BytesMut::with_capacity(total),
            remaining: total,
        }
    }
}

/// Everything a chunk stream remembers between chunks: the last fully
/// resolved header fields, the sticky extended-timestamp flag, and the
/// payload being reassembled.
#[derive(Debug, Default)]
struct ReadContext {
    timestamp: u32,
    timestamp_delta: u32,
    extended_timestamp: bool,
    message_length: u32,
    message_stream_id: u32,
    message_type_id: u8,
    incomplete: Option<ChunkPayload>,
}

/// Outcome of one decode attempt against the input cursor.
#[derive(Debug)]
pub enum ReadProgress {
    /// A message completed and decoded; the cursor sits after its last chunk.
    Message(Box<RtmpMessage>),
    /// A non-final chunk was consumed; the message is still reassembling.
    ChunkConsumed,
    /// A compressed header on a virgin chunk stream was dropped (lenient
    /// mode); decoding resumes after the offending header.
    Skipped,
    /// Not enough input; the cursor was rewound to the chunk start and this
    /// many bytes are missing on top of what is buffered.
    NeedMore(usize),
}

/// The chunk-stream reader: parses chunk headers against per-stream state
/// and reassembles message payloads at the negotiated chunk size.
#[derive(Debug)]
pub struct ChunkReader {
    contexts: HashMap<Csid, ReadContext>,
    chunk_size: usize,
    max_packet_size: usize,
    strict_headers: bool,
    bytes_received: u32,
}

impl Default for ChunkReader {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PACKET_SIZE, false)
    }
}

impl ChunkReader {
    pub fn new(max_packet_size: usize, strict_headers: bool) -> Self {
        Self {
            contexts: HashMap::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_packet_size,
            strict_headers,
            bytes_received: 0,
        }
    }

    #[inline]
    pub fn get_bytes_read(&self) -> u32 {
        self.bytes_received
    }

    #[inline]
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn set_chunk_size(&mut self, size: usize) -> usize {
        let old_size = self.chunk_size;
        self.chunk_size = size.max(1);
        old_size
    }

    /// Drop the in-flight reassembly on a chunk stream, as an Abort message
    /// demands. Header state survives; only the partial payload goes.
    pub fn abort_chunk_stream(&mut self, csid: Csid) {
        if let Some(context) = self.contexts.get_mut(&csid) {
            context.incomplete = None;
        }
    }

    /// Whether a chunk stream has a partially reassembled message.
    pub fn has_incomplete(&self, csid: Csid) -> bool {
        self.contexts
            .get(&csid)
            .is_some_and(|context| context.incomplete.is_some())
    }

    /// Attempt to consume exactly one chunk from the cursor. Never leaves
    /// the cursor mid-chunk: either it advances past a full chunk or it is
    /// rewound to where it started.
    pub fn read(&mut self, reader: &mut Cursor<&BytesMut>) -> ChunkMessageResult<ReadProgress> {
        let chunk_start = reader.position();
        if !reader.has_remaining() {
            return Ok(ReadProgress::NeedMore(1));
        }

        let first_byte = reader.read_u8()?;
        let fmt = first_byte >> 6;
        let discriminant = (first_byte & 0b0011_1111) as u32;
        let basic_len: usize = match discriminant {
            0 => 2,
            1 => 3,
            _ => 1,
        };
        let message_header_len: usize = match fmt {
            0 => 11,
            1 => 7,
            2 => 3,
            3 => 0,
            fmt => return Err(ChunkMessageError::UnexpectedFmt(fmt)),
        };

        let available = reader.remaining() + 1;
        if available < basic_len + message_header_len {
            reader.set_position(chunk_start);
            return Ok(ReadProgress::NeedMore(
                basic_len + message_header_len - available,
            ));
        }

        let csid: Csid = match discriminant {
            0 => 64 + reader.read_u8()? as Csid,
            1 => {
                let low = reader.read_u8()? as Csid;
                let high = reader.read_u8()? as Csid;
                64 + low + high * 256
            }
            id => id,
        };

        if fmt != 0 && !self.contexts.contains_key(&csid) {
            if self.strict_headers {
                return Err(ChunkMessageError::UnknownReadState { csid, fmt });
            }
            tracing::warn!(
                "compressed header (fmt {}) on virgin chunk stream {}, dropping the header",
                fmt,
                csid
            );
            reader.set_position(chunk_start + (basic_len + message_header_len) as u64);
            return Ok(ReadProgress::Skipped);
        }

        match fmt {
            0 => {
                let timestamp_field = reader.read_u24::<BigEndian>()?;
                let message_length = reader.read_u24::<BigEndian>()?;
                let message_type_id = reader.read_u8()?;
                let message_stream_id = reader.read_u32::<LittleEndian>()?;
                if message_length as usize > self.max_packet_size {
                    return Err(ChunkMessageError::OversizedMessage {
                        length: message_length,
                        limit: self.max_packet_size,
                    });
                }
                let extended = timestamp_field >= MAX_TIMESTAMP;
                let timestamp = if extended {
                    if reader.remaining() < 4 {
                        let shortfall = 4 - reader.remaining();
                        reader.set_position(chunk_start);
                        return Ok(ReadProgress::NeedMore(shortfall));
                    }
                    reader.read_u32::<BigEndian>()?
                } else {
                    timestamp_field
                };
                let context = self.contexts.entry(csid).or_default();
                context.timestamp = timestamp;
                context.timestamp_delta = 0;
                context.extended_timestamp = extended;
                context.message_length = message_length;
                context.message_type_id = message_type_id;
                context.message_stream_id = message_stream_id;
            }
            1 => {
                let delta_field = reader.read_u24::<BigEndian>()?;
                let message_length = reader.read_u24::<BigEndian>()?;
                let message_type_id = reader.read_u8()?;
                if message_length as usize > self.max_packet_size {
                    return Err(ChunkMessageError::OversizedMessage {
                        length: message_length,
                        limit: self.max_packet_size,
                    });
                }
                let extended = delta_field >= MAX_TIMESTAMP;
                let delta = if extended {
                    if reader.remaining() < 4 {
                        let shortfall = 4 - reader.remaining();
                        reader.set_position(chunk_start);
                        return Ok(ReadProgress::NeedMore(shortfall));
                    }
                    reader.read_u32::<BigEndian>()?
                } else {
                    delta_field
                };
                let context = self.contexts.get_mut(&csid).expect("context exists");
                context.timestamp = context.timestamp.wrapping_add(delta);
                context.timestamp_delta = delta;
                context.extended_timestamp = extended;
                context.message_length = message_length;
                context.message_type_id = message_type_id;
            }
            2 => {
                let delta_field = reader.read_u24::<BigEndian>()?;
                let extended = delta_field >= MAX_TIMESTAMP;
                let delta = if extended {
                    if reader.remaining() < 4 {
                        let shortfall = 4 - reader.remaining();
                        reader.set_position(chunk_start);
                        return Ok(ReadProgress::NeedMore(shortfall));
                    }
                    reader.read_u32::<BigEndian>()?
                } else {
                    delta_field
                };
                let context = self.contexts.get_mut(&csid).expect("context exists");
                context.timestamp = context.timestamp.wrapping_add(delta);
                context.timestamp_delta = delta;
                context.extended_timestamp = extended;
            }
            _ => {
                // fmt 3 inherits everything; when the stream's extended flag
                // is set, a 32-bit timestamp follows and replaces the base
                let context = self.contexts.get_mut(&csid).expect("context exists");
                if context.extended_timestamp {
                    if reader.remaining() < 4 {
                        let shortfall = 4 - reader.remaining();
                        reader.set_position(chunk_start);
                        return Ok(ReadProgress::NeedMore(shortfall));
                    }
                    context.timestamp = reader.read_u32::<BigEndian>()?;
                }
            }
        }

        let header_len = (reader.position() - chunk_start) as usize;
        let context = self.contexts.get_mut(&csid).expect("context exists");
        if context.incomplete.is_none() {
            context.incomplete = Some(ChunkPayload::new(context.message_length as usize));
        }
        let chunk = context.incomplete.as_mut().expect("just ensured");

        let bytes_needed = min(self.chunk_size, chunk.remaining);
        if reader.remaining() < bytes_needed {
            let shortfall = bytes_needed - reader.remaining();
            reader.set_position(chunk_start);
            return Ok(ReadProgress::NeedMore(shortfall));
        }

        let mut buffer = vec![0u8; bytes_needed];
        reader.read_exact(&mut buffer)?;
        chunk.payload.extend_from_slice(&buffer);
        chunk.remaining -= bytes_needed;
        let finished = chunk.remaining == 0;

        self.account(header_len + bytes_needed);

        if !finished {
            return Ok(ReadProgress::ChunkConsumed);
        }

        let context = self.contexts.get_mut(&csid).expect("context exists");
        let payload = context.incomplete.take().expect("just ensured").payload;
        let header = MessageHeader {
            chunk_stream_id: csid,
            timestamp: context.timestamp,
            message_length: context.message_length,
            message_type_id: context.message_type_id,
            message_stream_id: context.message_stream_id,
            extended_timestamp: context.extended_timestamp,
        };
        let body = RtmpMessageBody::read_remaining_from(&header, payload)?;
        Ok(ReadProgress::Message(Box::new(RtmpMessage { header, body })))
    }

    fn account(&mut self, bytes: usize) {
        let bytes = bytes as u32;
        if self.bytes_received.wrapping_add(bytes) > 0xF000_0000 {
            self.bytes_received = bytes;
        } else {
            self.bytes_received += bytes;
        }
    }
}
