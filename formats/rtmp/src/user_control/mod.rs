///! @see: 7.1.7. User Control Message Events
pub mod reader;
pub mod writer;

pub const USER_CONTROL_MESSAGE_TYPE: u8 = 4;
pub const USER_CONTROL_MESSAGE_STREAM_ID: u32 = 0;

/// Byte length of the SWF verification response payload.
pub const SWF_VERIFICATION_PAYLOAD_LENGTH: usize = 42;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserControlEvent {
    StreamBegin {
        stream_id: u32,
    },
    StreamEof {
        stream_id: u32,
    },
    StreamDry {
        stream_id: u32,
    },
    SetBufferLength {
        stream_id: u32,
        /// Buffer length in milliseconds.
        buffer_length: u32,
    },
    StreamIsRecorded {
        stream_id: u32,
    },
    PingRequest {
        timestamp: u32,
    },
    PingResponse {
        timestamp: u32,
    },
    /// SWF verification challenge; carries no arguments.
    SwfVerificationRequest,
    /// SWF verification answer; an opaque 42-byte HMAC blob.
    SwfVerificationResponse {
        payload: Vec<u8>,
    },
    /// Any event type this decoder has no name for; the single u32 argument
    /// is kept as-is.
    Unknown {
        event_type: u16,
        value: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserControlEventType {
    StreamBegin = 0,
    StreamEof = 1,
    StreamDry = 2,
    SetBufferLength = 3,
    StreamIsRecorded = 4,
    PingRequest = 6,
    PingResponse = 7,
    SwfVerificationRequest = 26,
    SwfVerificationResponse = 27,
}

impl From<UserControlEventType> for u16 {
    fn from(value: UserControlEventType) -> u16 {
        value as u16
    }
}
