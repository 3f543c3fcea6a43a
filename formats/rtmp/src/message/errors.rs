use std::io;

use thiserror::Error;

use amf::errors::AmfError;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error(
        "amf decode failed at position {position} of {limit}, remaining: {remaining_hex}: {source}"
    )]
    MalformedAmf {
        position: u64,
        limit: usize,
        remaining_hex: String,
        source: AmfError,
    },
    #[error("amf error: {0}")]
    Amf(#[from] AmfError),
    #[error("action message carries no action name")]
    MissingActionName,
    #[error("unknown shared object encoding selector: {0}")]
    UnknownSharedObjectEncoding(u8),
    #[error("unexpected amf value: {0}")]
    UnexpectedAmfType(String),
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}

impl MessageError {
    /// Wrap an AMF failure with the cursor position and a hex dump of what
    /// was left to parse, so the offending bytes can be replayed.
    pub(crate) fn malformed_amf(payload: &[u8], position: u64, source: AmfError) -> Self {
        let remaining = &payload[(position as usize).min(payload.len())..];
        MessageError::MalformedAmf {
            position,
            limit: payload.len(),
            remaining_hex: hex::encode(remaining),
            source,
        }
    }
}

pub type MessageResult<T> = Result<T, MessageError>;
