use std::{io, string};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AmfError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("invalid utf8 data: {0}")]
    InvalidUtf8(#[from] string::FromUtf8Error),
    #[error("unsupported amf value marker: {marker}")]
    Unsupported { marker: u8 },
    #[error("unknown amf value marker: {marker}")]
    Unknown { marker: u8 },
    #[error("reference index out of range: {index}")]
    OutOfRangeReference { index: usize },
    #[error("circular reference not supported, index: {index}")]
    CircularReference { index: usize },
    #[error("invalid value for a unix date: {milliseconds}")]
    InvalidDate { milliseconds: f64 },
    #[error("unexpected time zone offset in amf0 date: {offset}")]
    UnexpectedTimeZone { offset: i16 },
    #[error("externalizable classes are not supported, name: {name}")]
    UnsupportedExternalizable { name: String },
    #[error("u29 value out of range: {value}")]
    U29OutOfRange { value: u64 },
    #[error("value has no amf0 rendition: {reason}")]
    NotExpressible { reason: String },
}

pub type AmfResult<T> = Result<T, AmfError>;
