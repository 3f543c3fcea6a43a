use crate::message::errors::MessageError;

pub mod reader;
pub mod writer;

pub const PROTOCOL_CONTROL_MESSAGE_STREAM_ID: u32 = 0;

///! @see: 5.4.1. Set Chunk Size (1)
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |0|                     chunk size (31 bits)                    |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetChunkSize {
    pub chunk_size: u32, // in [1, 0xFFFFFF]
}

///! @see: 5.4.2. Abort Message (2)
/// Names the chunk stream whose partially received message is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbortMessage {
    pub chunk_stream_id: u32,
}

///! @see: 5.4.3. Acknowledgement (3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Acknowledgement {
    pub sequence_number: u32,
}

///! @see: 5.4.4. Window Acknowledgement Size (5)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowAckSize {
    pub size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetPeerBandwidthLimitType {
    Hard = 0,
    Soft = 1,
    Dynamic = 2,
}

impl TryFrom<u8> for SetPeerBandwidthLimitType {
    type Error = MessageError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SetPeerBandwidthLimitType::Hard),
            1 => Ok(SetPeerBandwidthLimitType::Soft),
            2 => Ok(SetPeerBandwidthLimitType::Dynamic),
            _ => Err(MessageError::InvalidMessage(format!(
                "unknown peer bandwidth limit type: {}",
                value
            ))),
        }
    }
}

///! @see: 5.4.5. Set Peer Bandwidth (6)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetPeerBandwidth {
    pub size: u32,
    pub limit_type: SetPeerBandwidthLimitType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolControlMessageType {
    SetChunkSize = 1,
    Abort = 2,
    Acknowledgement = 3,
    WindowAckSize = 5,
    SetPeerBandwidth = 6,
}

impl From<ProtocolControlMessageType> for u8 {
    fn from(value: ProtocolControlMessageType) -> u8 {
        value as u8
    }
}

impl TryFrom<u8> for ProtocolControlMessageType {
    type Error = MessageError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ProtocolControlMessageType::SetChunkSize),
            2 => Ok(ProtocolControlMessageType::Abort),
            3 => Ok(ProtocolControlMessageType::Acknowledgement),
            5 => Ok(ProtocolControlMessageType::WindowAckSize),
            6 => Ok(ProtocolControlMessageType::SetPeerBandwidth),
            _ => Err(MessageError::InvalidMessage(format!(
                "unknown protocol control message type: {}",
                value
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolControlMessage {
    SetChunkSize(SetChunkSize),
    Abort(AbortMessage),
    Ack(Acknowledgement),
    WindowAckSize(WindowAckSize),
    SetPeerBandwidth(SetPeerBandwidth),
}

impl ProtocolControlMessage {
    pub fn message_type(&self) -> ProtocolControlMessageType {
        match self {
            ProtocolControlMessage::SetChunkSize(_) => ProtocolControlMessageType::SetChunkSize,
            ProtocolControlMessage::Abort(_) => ProtocolControlMessageType::Abort,
            ProtocolControlMessage::Ack(_) => ProtocolControlMessageType::Acknowledgement,
            ProtocolControlMessage::WindowAckSize(_) => ProtocolControlMessageType::WindowAckSize,
            ProtocolControlMessage::SetPeerBandwidth(_) => {
                ProtocolControlMessageType::SetPeerBandwidth
            }
        }
    }
}
