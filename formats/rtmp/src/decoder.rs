use std::io::Cursor;

use tokio_util::bytes::{Buf, BytesMut};

use crate::{
    chunk::{
        consts::DEFAULT_MAX_PACKET_SIZE,
        errors::ChunkMessageResult,
        reader::{ChunkReader, ReadProgress},
    },
    message::{RtmpMessage, RtmpMessageBody},
    protocol_control::ProtocolControlMessage,
};

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DecoderConfig {
    pub max_packet_size: usize,
    /// When true, a compressed header on a virgin chunk stream tears the
    /// connection down instead of being skipped.
    pub close_on_header_error: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            close_on_header_error: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Error,
    Disconnecting,
    Disconnected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    Ready,
    /// The buffered input must grow to at least this many bytes before a
    /// decode attempt can make progress.
    NeedMore(usize),
}

/// The per-connection decode state machine: a pure function of
/// `(state, input bytes) -> (state, messages)`. The transport feeds bytes,
/// the decoder emits every message that completes and keeps the remainder
/// buffered for the next feed.
#[derive(Debug)]
pub struct ChunkStreamDecoder {
    buffer: BytesMut,
    reader: ChunkReader,
    connection_state: ConnectionState,
    decode_state: DecodeState,
}

impl Default for ChunkStreamDecoder {
    fn default() -> Self {
        Self::new(DecoderConfig::default())
    }
}

impl ChunkStreamDecoder {
    pub fn new(config: DecoderConfig) -> Self {
        Self {
            buffer: BytesMut::new(),
            reader: ChunkReader::new(config.max_packet_size, config.close_on_header_error),
            connection_state: ConnectionState::Connected,
            decode_state: DecodeState::Ready,
        }
    }

    #[inline]
    pub fn connection_state(&self) -> ConnectionState {
        self.connection_state
    }

    #[inline]
    pub fn decode_state(&self) -> DecodeState {
        self.decode_state
    }

    #[inline]
    pub fn read_chunk_size(&self) -> usize {
        self.reader.chunk_size()
    }

    #[inline]
    pub fn get_bytes_read(&self) -> u32 {
        self.reader.get_bytes_read()
    }

    pub fn has_incomplete(&self, chunk_stream_id: u32) -> bool {
        self.reader.has_incomplete(chunk_stream_id)
    }

    /// Feed transport bytes and collect every message that completes. A
    /// protocol error poisons the decoder: the buffer is dropped, the state
    /// moves to [`ConnectionState::Error`], and later feeds are ignored.
    pub fn feed(&mut self, bytes: &[u8]) -> ChunkMessageResult<Vec<RtmpMessage>> {
        if self.connection_state != ConnectionState::Connected {
            tracing::trace!(
                "dropping {} bytes fed in {:?} state",
                bytes.len(),
                self.connection_state
            );
            return Ok(Vec::new());
        }

        self.buffer.extend_from_slice(bytes);
        let mut messages = Vec::new();
        let mut consumed: usize = 0;

        loop {
            let remaining = self.buffer.len() - consumed;
            if remaining == 0 {
                self.decode_state = DecodeState::Ready;
                break;
            }
            if let DecodeState::NeedMore(needed) = self.decode_state {
                if remaining < needed {
                    break;
                }
            }

            let mut cursor = Cursor::new(&self.buffer);
            cursor.set_position(consumed as u64);
            match self.reader.read(&mut cursor) {
                Ok(ReadProgress::Message(message)) => {
                    consumed = cursor.position() as usize;
                    self.decode_state = DecodeState::Ready;
                    self.apply_protocol_control(&message);
                    messages.push(*message);
                }
                Ok(ReadProgress::ChunkConsumed) | Ok(ReadProgress::Skipped) => {
                    consumed = cursor.position() as usize;
                    self.decode_state = DecodeState::Ready;
                }
                Ok(ReadProgress::NeedMore(shortfall)) => {
                    self.decode_state = DecodeState::NeedMore(remaining + shortfall);
                    break;
                }
                Err(err) => {
                    self.buffer.clear();
                    self.connection_state = ConnectionState::Error;
                    return Err(err);
                }
            }
        }

        self.buffer.advance(consumed);
        Ok(messages)
    }

    /// Chunk-size and abort messages change how the rest of the stream is
    /// read; they take effect here, before the caller ever sees them.
    fn apply_protocol_control(&mut self, message: &RtmpMessage) {
        if let RtmpMessageBody::ProtocolControl(control) = &message.body {
            match control {
                ProtocolControlMessage::SetChunkSize(request) => {
                    let old_size = self.reader.set_chunk_size(request.chunk_size as usize);
                    tracing::trace!(
                        "read chunk size updated, {} -> {}",
                        old_size,
                        request.chunk_size
                    );
                }
                ProtocolControlMessage::Abort(request) => {
                    tracing::trace!("aborting chunk stream {}", request.chunk_stream_id);
                    self.reader.abort_chunk_stream(request.chunk_stream_id);
                }
                _ => {}
            }
        }
    }

    /// The transport decided to close; further input is ignored.
    pub fn begin_disconnect(&mut self) {
        if self.connection_state == ConnectionState::Connected {
            self.connection_state = ConnectionState::Disconnecting;
        }
    }

    pub fn finish_disconnect(&mut self) {
        self.connection_state = ConnectionState::Disconnected;
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        chunk::{errors::ChunkMessageError, writer::ChunkWriter},
        message::media::AudioData,
        protocol_control::SetChunkSize,
    };

    fn fmt0_header(csid: u8, timestamp: u32, length: u32, type_id: u8, stream_id: u32) -> Vec<u8> {
        let mut bytes = vec![csid & 0x3F];
        bytes.extend_from_slice(&timestamp.to_be_bytes()[1..]);
        bytes.extend_from_slice(&length.to_be_bytes()[1..]);
        bytes.push(type_id);
        bytes.extend_from_slice(&stream_id.to_le_bytes());
        bytes
    }

    #[test]
    fn single_chunk_set_chunk_size() {
        let mut decoder = ChunkStreamDecoder::default();
        let bytes = [
            0x03, 0x00, 0x00, 0x00, 0x00, 0x00, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
            0x10, 0x00,
        ];
        let messages = decoder.feed(&bytes).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(
            messages[0].body,
            RtmpMessageBody::ProtocolControl(ProtocolControlMessage::SetChunkSize(SetChunkSize {
                chunk_size: 4096,
            }))
        );
        assert_eq!(decoder.read_chunk_size(), 4096);
    }

    #[test]
    fn two_chunk_audio_reassembles() {
        let mut decoder = ChunkStreamDecoder::default();
        let payload = vec![0xAFu8; 200];
        let mut bytes = fmt0_header(4, 1000, 200, 8, 1);
        bytes.extend_from_slice(&payload[..128]);
        bytes.push(0xC4); // fmt 3 continuation on csid 4
        bytes.extend_from_slice(&payload[128..]);

        let messages = decoder.feed(&bytes).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].header.timestamp, 1000);
        let RtmpMessageBody::Audio(AudioData { payload: body, .. }) = &messages[0].body else {
            panic!("expected audio");
        };
        assert_eq!(body.len(), 200);
        assert!(!decoder.has_incomplete(4));
    }

    #[test]
    fn extended_timestamp_replaces_the_base_on_fmt3() {
        let mut decoder = ChunkStreamDecoder::default();
        let mut bytes = fmt0_header(5, 0xFFFFFF, 2, 8, 1);
        bytes.extend_from_slice(&0x0001_0000u32.to_be_bytes());
        bytes.extend_from_slice(&[0xAF, 0x01]);
        bytes.push(0xC5); // fmt 3, extended flag is sticky
        bytes.extend_from_slice(&0x0001_0080u32.to_be_bytes());
        bytes.extend_from_slice(&[0xAF, 0x01]);

        let messages = decoder.feed(&bytes).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].header.timestamp, 65536);
        assert!(messages[0].header.extended_timestamp);
        assert_eq!(messages[1].header.timestamp, 65664);
    }

    #[test]
    fn timestamp_field_below_the_sentinel_is_not_extended() {
        let mut decoder = ChunkStreamDecoder::default();
        let mut bytes = fmt0_header(5, 0xFFFFFE, 1, 8, 1);
        bytes.push(0xAF);
        let messages = decoder.feed(&bytes).unwrap();
        assert_eq!(messages[0].header.timestamp, 0xFFFFFE);
        assert!(!messages[0].header.extended_timestamp);
    }

    #[test]
    fn abort_discards_the_partial_message() {
        let mut decoder = ChunkStreamDecoder::default();
        // open a 1000 byte video and deliver two full chunks
        let mut bytes = fmt0_header(6, 40, 1000, 9, 1);
        bytes.extend_from_slice(&[0x17u8; 128]);
        bytes.push(0xC6);
        bytes.extend_from_slice(&[0u8; 128]);
        assert!(decoder.feed(&bytes).unwrap().is_empty());
        assert!(decoder.has_incomplete(6));

        // abort names chunk stream 6
        let mut abort = fmt0_header(2, 0, 4, 2, 0);
        abort.extend_from_slice(&6u32.to_be_bytes());
        let messages = decoder.feed(&abort).unwrap();
        assert_eq!(messages.len(), 1);
        assert!(!decoder.has_incomplete(6));

        // a fresh fmt 0 on the same stream starts cleanly
        let mut clean = fmt0_header(6, 80, 2, 9, 1);
        clean.extend_from_slice(&[0x17, 0x01]);
        let messages = decoder.feed(&clean).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].header.timestamp, 80);
    }

    #[test]
    fn connect_invoke_round_trips_through_the_writer() {
        let mut writer = ChunkWriter::new();
        writer
            .write_invoke(
                "connect",
                1.0,
                Some(&[(
                    "app".to_string(),
                    amf::string("live", amf::Version::Amf0),
                )]),
                &[],
            )
            .unwrap();

        let mut decoder = ChunkStreamDecoder::default();
        let messages = decoder.feed(&writer.take()).unwrap();
        assert_eq!(messages.len(), 1);
        let RtmpMessageBody::Invoke(call) = &messages[0].body else {
            panic!("expected an invoke");
        };
        assert_eq!(call.service_name, None);
        assert_eq!(call.method, "connect");
        assert_eq!(call.transaction_id, 1.0);
        assert!(call.arguments.is_empty());
        let params = call.connection_params.as_ref().unwrap();
        assert_eq!(params["app"].try_as_str(), Some("live"));
    }

    #[test]
    fn chunk_size_change_applies_to_later_chunks_only() {
        let mut decoder = ChunkStreamDecoder::default();
        // open a 300 byte audio message at the default 128 byte chunk size
        let mut bytes = fmt0_header(7, 0, 300, 8, 1);
        bytes.extend_from_slice(&[0xAFu8; 128]);
        assert!(decoder.feed(&bytes).unwrap().is_empty());

        // a chunk size update on the control stream
        let mut control = fmt0_header(2, 0, 4, 1, 0);
        control.extend_from_slice(&200u32.to_be_bytes());
        let messages = decoder.feed(&control).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(decoder.read_chunk_size(), 200);

        // the in-flight message continues at the new chunk size:
        // min(200, 300 - 128) = 172 bytes finish it
        let mut rest = vec![0xC7];
        rest.extend_from_slice(&[0xAFu8; 172]);
        let messages = decoder.feed(&rest).unwrap();
        assert_eq!(messages.len(), 1);
        let RtmpMessageBody::Audio(AudioData { payload, .. }) = &messages[0].body else {
            panic!("expected audio");
        };
        assert_eq!(payload.len(), 300);
    }

    #[test]
    fn timestamp_chaining_across_header_formats() {
        let mut decoder = ChunkStreamDecoder::default();
        let mut bytes = fmt0_header(8, 100, 2, 8, 1);
        bytes.extend_from_slice(&[0xAF, 0x01]);
        // fmt 1: delta 25, same stream
        bytes.push(0x48);
        bytes.extend_from_slice(&[0, 0, 25]);
        bytes.extend_from_slice(&[0, 0, 2]);
        bytes.push(8);
        bytes.extend_from_slice(&[0xAF, 0x01]);
        // fmt 2: delta 25 again
        bytes.push(0x88);
        bytes.extend_from_slice(&[0, 0, 25]);
        bytes.extend_from_slice(&[0xAF, 0x01]);
        // fmt 3: everything inherits, timestamp repeats
        bytes.push(0xC8);
        bytes.extend_from_slice(&[0xAF, 0x01]);

        let messages = decoder.feed(&bytes).unwrap();
        let timestamps: Vec<u32> = messages.iter().map(|m| m.header.timestamp).collect();
        assert_eq!(timestamps, vec![100, 125, 150, 150]);
    }

    #[test]
    fn message_at_the_packet_limit_is_accepted_and_one_past_is_fatal() {
        let config = DecoderConfig {
            max_packet_size: 256,
            close_on_header_error: false,
        };

        let mut decoder = ChunkStreamDecoder::new(config.clone());
        let mut bytes = fmt0_header(3, 0, 256, 8, 1);
        bytes.extend_from_slice(&[0xAFu8; 128]);
        bytes.push(0xC3);
        bytes.extend_from_slice(&[0xAFu8; 128]);
        let messages = decoder.feed(&bytes).unwrap();
        assert_eq!(messages.len(), 1);

        let mut decoder = ChunkStreamDecoder::new(config);
        let bytes = fmt0_header(3, 0, 257, 8, 1);
        let err = decoder.feed(&bytes).unwrap_err();
        assert!(matches!(
            err,
            ChunkMessageError::OversizedMessage {
                length: 257,
                limit: 256,
            }
        ));
        assert_eq!(decoder.connection_state(), ConnectionState::Error);
        // the decoder stays poisoned
        assert!(decoder.feed(&[0x03]).unwrap().is_empty());
    }

    #[test]
    fn strict_mode_tears_down_on_orphan_compressed_headers() {
        let mut decoder = ChunkStreamDecoder::new(DecoderConfig {
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            close_on_header_error: true,
        });
        let err = decoder.feed(&[0x83, 0, 0, 5]).unwrap_err();
        assert!(matches!(
            err,
            ChunkMessageError::UnknownReadState { csid: 3, fmt: 2 }
        ));
        assert_eq!(decoder.connection_state(), ConnectionState::Error);
    }

    #[test]
    fn lenient_mode_skips_orphans_and_recovers() {
        let mut decoder = ChunkStreamDecoder::default();
        // an orphan fmt 2 header, then a valid single-chunk audio message
        let mut bytes = vec![0x89, 0, 0, 5];
        let mut valid = fmt0_header(3, 10, 1, 8, 1);
        valid.push(0xAF);
        bytes.extend_from_slice(&valid);

        let messages = decoder.feed(&bytes).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].header.timestamp, 10);
    }

    #[test]
    fn feeding_byte_by_byte_matches_one_shot_decoding() {
        let mut writer = ChunkWriter::new();
        writer.write_set_chunk_size(64).unwrap();
        writer
            .write_audio(&[0xAFu8; 200], 1000, 1)
            .unwrap();
        writer.write_video(&[0x17u8; 150], 1005, 1).unwrap();
        writer.write_audio(&[0xAFu8; 120], 1020, 1).unwrap();
        writer.write_audio(&[0xAFu8; 120], 1040, 1).unwrap();
        writer
            .write_invoke("releaseStream", 2.0, None, &[amf::string("live", amf::Version::Amf0)])
            .unwrap();
        let stream = writer.take();

        let mut one_shot = ChunkStreamDecoder::default();
        let expected = one_shot.feed(&stream).unwrap();
        assert_eq!(expected.len(), 6);

        let mut trickle = ChunkStreamDecoder::default();
        let mut collected = Vec::new();
        for byte in &stream {
            collected.extend(trickle.feed(std::slice::from_ref(byte)).unwrap());
        }
        assert_eq!(collected, expected);
    }

    #[test]
    fn no_message_is_emitted_until_its_last_byte_arrives() {
        let mut decoder = ChunkStreamDecoder::default();
        let mut bytes = fmt0_header(3, 0, 4, 8, 1);
        bytes.extend_from_slice(&[0xAF, 0x00, 0x01, 0x02]);

        let (head, tail) = bytes.split_at(bytes.len() - 1);
        assert!(decoder.feed(head).unwrap().is_empty());
        assert!(matches!(decoder.decode_state(), DecodeState::NeedMore(_)));
        let messages = decoder.feed(tail).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(decoder.decode_state(), DecodeState::Ready);
    }
}
