use tokio_util::bytes::BytesMut;

use crate::{
    chunk::MessageHeader,
    command::{ActionCall, StreamDataEvent},
    protocol_control::ProtocolControlMessage,
    shared_object::SharedObjectMessage,
    user_control::UserControlEvent,
};

pub mod errors;
pub mod media;
pub mod reader;

use errors::MessageError;
use media::{AudioData, VideoData};

///! @see: 6.1. RTMP Message Format; the type ids are protocol constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtmpMessageType {
    SetChunkSize = 1,
    Abort = 2,
    Acknowledgement = 3,
    UserControl = 4,
    WindowAckSize = 5,
    SetPeerBandwidth = 6,
    Audio = 8,
    Video = 9,
    Amf3Data = 15,
    Amf3SharedObject = 16,
    Amf3Command = 17,
    Amf0Data = 18,
    Amf0SharedObject = 19,
    Amf0Command = 20,
    Aggregate = 22,
}

impl From<RtmpMessageType> for u8 {
    fn from(value: RtmpMessageType) -> u8 {
        value as u8
    }
}

impl TryFrom<u8> for RtmpMessageType {
    type Error = MessageError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(RtmpMessageType::SetChunkSize),
            2 => Ok(RtmpMessageType::Abort),
            3 => Ok(RtmpMessageType::Acknowledgement),
            4 => Ok(RtmpMessageType::UserControl),
            5 => Ok(RtmpMessageType::WindowAckSize),
            6 => Ok(RtmpMessageType::SetPeerBandwidth),
            8 => Ok(RtmpMessageType::Audio),
            9 => Ok(RtmpMessageType::Video),
            15 => Ok(RtmpMessageType::Amf3Data),
            16 => Ok(RtmpMessageType::Amf3SharedObject),
            17 => Ok(RtmpMessageType::Amf3Command),
            18 => Ok(RtmpMessageType::Amf0Data),
            19 => Ok(RtmpMessageType::Amf0SharedObject),
            20 => Ok(RtmpMessageType::Amf0Command),
            22 => Ok(RtmpMessageType::Aggregate),
            value => Err(MessageError::InvalidMessage(format!(
                "unknown message type id: {}",
                value
            ))),
        }
    }
}

/// A fully reassembled and decoded protocol message.
#[derive(Debug, Clone, PartialEq)]
pub struct RtmpMessage {
    pub header: MessageHeader,
    pub body: RtmpMessageBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RtmpMessageBody {
    ProtocolControl(ProtocolControlMessage),
    UserControl(UserControlEvent),
    Audio(AudioData),
    Video(VideoData),
    /// Back-to-back FLV tags; retained raw for downstream demuxing.
    Aggregate { payload: BytesMut },
    Invoke(ActionCall),
    Notify(ActionCall),
    StreamData(StreamDataEvent),
    SharedObject(SharedObjectMessage),
    /// Surfaced, never fatal.
    Unknown { message_type_id: u8, payload: BytesMut },
}
