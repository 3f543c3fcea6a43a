use std::{cmp::min, collections::HashMap};

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use utils::traits::writer::WriteTo;

use crate::{
    message::RtmpMessageType,
    protocol_control::{
        AbortMessage, Acknowledgement, PROTOCOL_CONTROL_MESSAGE_STREAM_ID,
        ProtocolControlMessage, SetChunkSize, SetPeerBandwidth, SetPeerBandwidthLimitType,
        WindowAckSize,
    },
    user_control::{USER_CONTROL_MESSAGE_STREAM_ID, UserControlEvent},
};

use super::{
    Csid,
    consts::{DEFAULT_CHUNK_SIZE, MAX_TIMESTAMP, csid},
    errors::{ChunkMessageError, ChunkMessageResult},
};

#[derive(Debug, Default)]
struct WriteContext {
    timestamp: u32,
    timestamp_delta: u32,
    extended_timestamp: bool,
    message_length: u32,
    message_stream_id: u32,
    message_type_id: u8,
}

/// The outbound side of the chunk stream: picks the most compressed header
/// the per-stream state allows, splits payloads at the chunk size, and
/// repeats the extended timestamp on every continuation chunk that needs
/// one.
#[derive(Debug)]
pub struct ChunkWriter {
    inner: Vec<u8>,
    contexts: HashMap<Csid, WriteContext>,
    chunk_size: usize,
    bytes_written: usize,
}

impl Default for ChunkWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkWriter {
    pub fn new() -> Self {
        Self {
            inner: Vec::with_capacity(4096),
            contexts: HashMap::new(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            bytes_written: 0,
        }
    }

    #[inline]
    pub fn get_bytes_written(&self) -> usize {
        self.bytes_written
    }

    /// Drain everything written so far.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.inner)
    }

    pub fn buffered(&self) -> &[u8] {
        &self.inner
    }

    /// Write one message, chunked at the current chunk size.
    pub fn write_message(
        &mut self,
        chunk_stream_id: Csid,
        timestamp: u32,
        message_type_id: u8,
        message_stream_id: u32,
        payload: &[u8],
    ) -> ChunkMessageResult<()> {
        super::ChunkBasicHeader::new(0, chunk_stream_id)?;
        let message_length = payload.len() as u32;

        let fmt = self.select_fmt(
            chunk_stream_id,
            timestamp,
            message_type_id,
            message_stream_id,
            message_length,
        );
        self.write_basic_header(fmt, chunk_stream_id)?;
        let extended =
            self.write_message_header(fmt, chunk_stream_id, timestamp, message_type_id, message_stream_id, message_length)?;

        let first_len = min(self.chunk_size, payload.len());
        self.inner.extend_from_slice(&payload[..first_len]);
        self.bytes_written += first_len;

        let mut written = first_len;
        while written < payload.len() {
            self.write_basic_header(3, chunk_stream_id)?;
            if extended {
                self.inner.write_u32::<BigEndian>(timestamp)?;
                self.bytes_written += 4;
            }
            let chunk_len = min(self.chunk_size, payload.len() - written);
            self.inner
                .extend_from_slice(&payload[written..written + chunk_len]);
            self.bytes_written += chunk_len;
            written += chunk_len;
        }
        Ok(())
    }

    /// Pick the most compressed header format the stream's write context
    /// still allows. A timestamp that moves backwards always forces a full
    /// header.
    fn select_fmt(
        &self,
        chunk_stream_id: Csid,
        timestamp: u32,
        message_type_id: u8,
        message_stream_id: u32,
        message_length: u32,
    ) -> u8 {
        let Some(context) = self.contexts.get(&chunk_stream_id) else {
            return 0;
        };
        if timestamp < context.timestamp || context.message_stream_id != message_stream_id {
            return 0;
        }
        let delta = timestamp - context.timestamp;
        if context.message_length == message_length
            && context.message_type_id == message_type_id
        {
            // fmt 3 repeats the previous timestamp verbatim unless the
            // extended field re-transmits an absolute one
            if delta == 0 || context.extended_timestamp {
                3
            } else {
                2
            }
        } else {
            1
        }
    }

    fn write_basic_header(&mut self, fmt: u8, chunk_stream_id: Csid) -> ChunkMessageResult<()> {
        match chunk_stream_id {
            2..=63 => {
                self.inner.write_u8((fmt << 6) | chunk_stream_id as u8)?;
                self.bytes_written += 1;
            }
            64..=319 => {
                self.inner.write_u8(fmt << 6)?;
                self.inner.write_u8((chunk_stream_id - 64) as u8)?;
                self.bytes_written += 2;
            }
            320..=65599 => {
                self.inner.write_u8((fmt << 6) | 1)?;
                let encoded = chunk_stream_id - 64;
                self.inner.write_u8((encoded & 0xFF) as u8)?;
                self.inner.write_u8((encoded >> 8) as u8)?;
                self.bytes_written += 3;
            }
            _ => {
                return Err(ChunkMessageError::InvalidBasicHeader(format!(
                    "csid out of range: {}",
                    chunk_stream_id
                )));
            }
        }
        Ok(())
    }

    /// Write the message header for `fmt` and update the stream's write
    /// context; returns whether the extended timestamp is in force (so
    /// continuation chunks repeat it).
    #[allow(clippy::too_many_arguments)]
    fn write_message_header(
        &mut self,
        fmt: u8,
        chunk_stream_id: Csid,
        timestamp: u32,
        message_type_id: u8,
        message_stream_id: u32,
        message_length: u32,
    ) -> ChunkMessageResult<bool> {
        let context = self.contexts.entry(chunk_stream_id).or_default();
        let extended;
        match fmt {
            0 => {
                extended = timestamp >= MAX_TIMESTAMP;
                self.inner
                    .write_u24::<BigEndian>(timestamp.min(MAX_TIMESTAMP))?;
                self.inner.write_u24::<BigEndian>(message_length)?;
                self.inner.write_u8(message_type_id)?;
                self.inner.write_u32::<LittleEndian>(message_stream_id)?;
                self.bytes_written += 11;
                if extended {
                    self.inner.write_u32::<BigEndian>(timestamp)?;
                    self.bytes_written += 4;
                }
                context.timestamp = timestamp;
                context.timestamp_delta = 0;
            }
            1 => {
                let delta = timestamp - context.timestamp;
                extended = delta >= MAX_TIMESTAMP;
                self.inner.write_u24::<BigEndian>(delta.min(MAX_TIMESTAMP))?;
                self.inner.write_u24::<BigEndian>(message_length)?;
                self.inner.write_u8(message_type_id)?;
                self.bytes_written += 7;
                if extended {
                    self.inner.write_u32::<BigEndian>(delta)?;
                    self.bytes_written += 4;
                }
                context.timestamp = timestamp;
                context.timestamp_delta = delta;
            }
            2 => {
                let delta = timestamp - context.timestamp;
                extended = delta >= MAX_TIMESTAMP;
                self.inner.write_u24::<BigEndian>(delta.min(MAX_TIMESTAMP))?;
                self.bytes_written += 3;
                if extended {
                    self.inner.write_u32::<BigEndian>(delta)?;
                    self.bytes_written += 4;
                }
                context.timestamp = timestamp;
                context.timestamp_delta = delta;
            }
            _ => {
                extended = context.extended_timestamp;
                if extended {
                    self.inner.write_u32::<BigEndian>(timestamp)?;
                    self.bytes_written += 4;
                }
                context.timestamp = timestamp;
            }
        }
        context.extended_timestamp = extended;
        context.message_length = message_length;
        context.message_type_id = message_type_id;
        context.message_stream_id = message_stream_id;
        Ok(extended)
    }

    fn write_control(
        &mut self,
        message_type: RtmpMessageType,
        message: &ProtocolControlMessage,
    ) -> ChunkMessageResult<()> {
        let mut payload = Vec::new();
        message.write_to(&mut payload)?;
        self.write_message(
            csid::PROTOCOL_CONTROL.into(),
            0,
            message_type.into(),
            PROTOCOL_CONTROL_MESSAGE_STREAM_ID,
            &payload,
        )
    }

    /// Announce a new chunk size and adopt it for every later chunk.
    pub fn write_set_chunk_size(&mut self, chunk_size: u32) -> ChunkMessageResult<()> {
        self.write_control(
            RtmpMessageType::SetChunkSize,
            &ProtocolControlMessage::SetChunkSize(SetChunkSize {
                chunk_size: chunk_size & 0x7FFF_FFFF,
            }),
        )?;
        self.chunk_size = chunk_size as usize;
        Ok(())
    }

    pub fn write_abort(&mut self, chunk_stream_id: u32) -> ChunkMessageResult<()> {
        self.write_control(
            RtmpMessageType::Abort,
            &ProtocolControlMessage::Abort(AbortMessage { chunk_stream_id }),
        )
    }

    pub fn write_acknowledgement(&mut self, sequence_number: u32) -> ChunkMessageResult<()> {
        self.write_control(
            RtmpMessageType::Acknowledgement,
            &ProtocolControlMessage::Ack(Acknowledgement { sequence_number }),
        )
    }

    pub fn write_window_ack_size(&mut self, size: u32) -> ChunkMessageResult<()> {
        self.write_control(
            RtmpMessageType::WindowAckSize,
            &ProtocolControlMessage::WindowAckSize(WindowAckSize { size }),
        )
    }

    pub fn write_set_peer_bandwidth(
        &mut self,
        size: u32,
        limit_type: SetPeerBandwidthLimitType,
    ) -> ChunkMessageResult<()> {
        self.write_control(
            RtmpMessageType::SetPeerBandwidth,
            &ProtocolControlMessage::SetPeerBandwidth(SetPeerBandwidth { size, limit_type }),
        )
    }

    pub fn write_user_control(&mut self, event: &UserControlEvent) -> ChunkMessageResult<()> {
        let mut payload = Vec::new();
        event.write_to(&mut payload)?;
        self.write_message(
            csid::PROTOCOL_CONTROL.into(),
            0,
            RtmpMessageType::UserControl.into(),
            USER_CONTROL_MESSAGE_STREAM_ID,
            &payload,
        )
    }

    pub fn write_audio(
        &mut self,
        payload: &[u8],
        timestamp: u32,
        message_stream_id: u32,
    ) -> ChunkMessageResult<()> {
        self.write_message(
            csid::AUDIO.into(),
            timestamp,
            RtmpMessageType::Audio.into(),
            message_stream_id,
            payload,
        )
    }

    pub fn write_video(
        &mut self,
        payload: &[u8],
        timestamp: u32,
        message_stream_id: u32,
    ) -> ChunkMessageResult<()> {
        self.write_message(
            csid::VIDEO.into(),
            timestamp,
            RtmpMessageType::Video.into(),
            message_stream_id,
            payload,
        )
    }

    /// Serialize and write an invoke on the NetConnection command stream.
    pub fn write_invoke(
        &mut self,
        action: &str,
        transaction_id: f64,
        command_object: Option<&[(String, amf::Value)]>,
        arguments: &[amf::Value],
    ) -> ChunkMessageResult<()> {
        let mut payload = Vec::new();
        amf::amf0::Value::write_string(&mut payload, action).map_err(to_message_error)?;
        amf::amf0::Value::write_number(&mut payload, transaction_id).map_err(to_message_error)?;
        match command_object {
            Some(entries) => {
                let entries = entries
                    .iter()
                    .map(|(key, value)| Ok((key.clone(), value.to_amf0()?)))
                    .collect::<Result<Vec<_>, amf::errors::AmfError>>()
                    .map_err(to_message_error)?;
                amf::amf0::Value::write_object(&mut payload, None, &entries)
                    .map_err(to_message_error)?;
            }
            None => amf::amf0::Value::write_null(&mut payload).map_err(to_message_error)?,
        }
        for argument in arguments {
            argument
                .to_amf0()
                .and_then(|value| value.write_to(&mut payload))
                .map_err(to_message_error)?;
        }
        self.write_message(
            csid::NET_CONNECTION_COMMAND.into(),
            0,
            RtmpMessageType::Amf0Command.into(),
            0,
            &payload,
        )
    }
}

fn to_message_error(err: amf::errors::AmfError) -> ChunkMessageError {
    ChunkMessageError::Message(crate::message::errors::MessageError::Amf(err))
}
