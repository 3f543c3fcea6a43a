use std::io;

use thiserror::Error;

use crate::message::errors::MessageError;

#[derive(Debug, Error)]
pub enum ChunkMessageError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("unexpected fmt bits: {0:#b}")]
    UnexpectedFmt(u8),
    #[error("invalid basic header: {0}")]
    InvalidBasicHeader(String),
    #[error("compressed header (fmt {fmt}) on chunk stream {csid} with no prior full header")]
    UnknownReadState { csid: u32, fmt: u8 },
    #[error("declared message size {length} exceeds the {limit} byte packet limit")]
    OversizedMessage { length: u32, limit: usize },
    #[error("message decode failed: {0}")]
    Message(#[from] MessageError),
}

pub type ChunkMessageResult<T> = Result<T, ChunkMessageError>;
