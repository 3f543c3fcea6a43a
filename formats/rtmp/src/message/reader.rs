use amf::Version;
use tokio_util::bytes::BytesMut;
use utils::traits::reader::{ReadFrom, ReadRemainingFrom};

use crate::{
    chunk::MessageHeader,
    command::reader::{read_action_call, read_stream_data},
    protocol_control::ProtocolControlMessage,
    shared_object::reader::read_shared_object,
    user_control::UserControlEvent,
};

use super::{
    RtmpMessageBody, RtmpMessageType,
    errors::{MessageError, MessageResult},
    media::{AudioData, VideoData},
};

impl RtmpMessageBody {
    /// Decode a reassembled payload according to the header's data type.
    /// Unknown data types are surfaced as [`RtmpMessageBody::Unknown`], not
    /// treated as protocol errors.
    pub fn read_remaining_from(
        header: &MessageHeader,
        payload: BytesMut,
    ) -> MessageResult<RtmpMessageBody> {
        let Ok(message_type) = RtmpMessageType::try_from(header.message_type_id) else {
            tracing::warn!(
                "unknown message type {} on chunk stream {}, {} byte payload kept raw",
                header.message_type_id,
                header.chunk_stream_id,
                payload.len()
            );
            return Ok(RtmpMessageBody::Unknown {
                message_type_id: header.message_type_id,
                payload,
            });
        };

        let body = match message_type {
            RtmpMessageType::SetChunkSize
            | RtmpMessageType::Abort
            | RtmpMessageType::Acknowledgement
            | RtmpMessageType::WindowAckSize
            | RtmpMessageType::SetPeerBandwidth => {
                let control_type = header.message_type_id.try_into()?;
                RtmpMessageBody::ProtocolControl(ProtocolControlMessage::read_remaining_from(
                    control_type,
                    &mut &payload[..],
                )?)
            }
            RtmpMessageType::UserControl => {
                RtmpMessageBody::UserControl(UserControlEvent::read_from(&mut &payload[..])?)
            }
            RtmpMessageType::Audio => RtmpMessageBody::Audio(AudioData::parse(payload)),
            RtmpMessageType::Video => RtmpMessageBody::Video(VideoData::parse(payload)),
            RtmpMessageType::Aggregate => RtmpMessageBody::Aggregate { payload },
            RtmpMessageType::Amf0Command => {
                RtmpMessageBody::Invoke(read_action_call(&payload, false)?)
            }
            RtmpMessageType::Amf3Command => {
                RtmpMessageBody::Invoke(read_action_call(&payload, true)?)
            }
            RtmpMessageType::Amf0Data => {
                if header.message_stream_id != 0 {
                    RtmpMessageBody::StreamData(read_stream_data(&payload, false)?)
                } else {
                    RtmpMessageBody::Notify(read_action_call(&payload, false)?)
                }
            }
            RtmpMessageType::Amf3Data => {
                RtmpMessageBody::StreamData(read_stream_data(&payload, true)?)
            }
            RtmpMessageType::Amf0SharedObject => {
                RtmpMessageBody::SharedObject(read_shared_object(&payload, Version::Amf0)?)
            }
            RtmpMessageType::Amf3SharedObject => {
                let Some(selector) = payload.first().copied() else {
                    return Err(MessageError::InvalidMessage(
                        "flex shared object without an encoding selector".to_string(),
                    ));
                };
                let version = match selector {
                    0 => Version::Amf0,
                    3 => Version::Amf3,
                    selector => {
                        return Err(MessageError::UnknownSharedObjectEncoding(selector));
                    }
                };
                RtmpMessageBody::SharedObject(read_shared_object(&payload[1..], version)?)
            }
        };
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol_control::SetChunkSize;

    fn header(message_type_id: u8, message_stream_id: u32) -> MessageHeader {
        MessageHeader {
            chunk_stream_id: 3,
            timestamp: 0,
            message_length: 0,
            message_type_id,
            message_stream_id,
            extended_timestamp: false,
        }
    }

    #[test]
    fn set_chunk_size_dispatches_to_protocol_control() {
        let payload = BytesMut::from(&[0x00u8, 0x00, 0x10, 0x00][..]);
        let body = RtmpMessageBody::read_remaining_from(&header(1, 0), payload).unwrap();
        assert_eq!(
            body,
            RtmpMessageBody::ProtocolControl(ProtocolControlMessage::SetChunkSize(SetChunkSize {
                chunk_size: 4096,
            }))
        );
    }

    #[test]
    fn notify_on_stream_zero_is_an_action() {
        let mut payload = Vec::new();
        amf::amf0::Value::write_string(&mut payload, "onStatus").unwrap();
        let body =
            RtmpMessageBody::read_remaining_from(&header(18, 0), BytesMut::from(&payload[..]))
                .unwrap();
        assert!(matches!(body, RtmpMessageBody::Notify(call) if call.method == "onStatus"));
    }

    #[test]
    fn notify_on_a_live_stream_is_stream_data() {
        let mut payload = Vec::new();
        amf::amf0::Value::write_string(&mut payload, "onTextData").unwrap();
        let body =
            RtmpMessageBody::read_remaining_from(&header(18, 1), BytesMut::from(&payload[..]))
                .unwrap();
        assert!(matches!(body, RtmpMessageBody::StreamData(_)));
    }

    #[test]
    fn flex_shared_object_selector_is_validated() {
        let err = RtmpMessageBody::read_remaining_from(
            &header(16, 0),
            BytesMut::from(&[0x07u8][..]),
        )
        .unwrap_err();
        assert!(matches!(err, MessageError::UnknownSharedObjectEncoding(7)));
    }

    #[test]
    fn aggregate_payload_is_kept_raw() {
        let payload = BytesMut::from(&[0x08u8, 0x00, 0x00, 0x02, 0xAF, 0x01][..]);
        let body =
            RtmpMessageBody::read_remaining_from(&header(22, 1), payload.clone()).unwrap();
        assert_eq!(body, RtmpMessageBody::Aggregate { payload });
    }

    #[test]
    fn unknown_type_is_surfaced_not_fatal() {
        let body = RtmpMessageBody::read_remaining_from(
            &header(99, 0),
            BytesMut::from(&[0xAAu8, 0xBB][..]),
        )
        .unwrap();
        assert_eq!(
            body,
            RtmpMessageBody::Unknown {
                message_type_id: 99,
                payload: BytesMut::from(&[0xAAu8, 0xBB][..]),
            }
        );
    }
}
