use std::io;

use crate::{amf3, errors::AmfResult};

mod reader;
mod writer;

pub use self::reader::Reader;

/// @see: AMF 0 file format spec, 2.1 Types Overview
pub(crate) mod amf0_marker {
    pub const NUMBER: u8 = 0x00;
    pub const BOOLEAN: u8 = 0x01;
    pub const STRING: u8 = 0x02;
    pub const OBJECT: u8 = 0x03;
    pub const MOVIECLIP: u8 = 0x04;
    pub const NULL: u8 = 0x05;
    pub const UNDEFINED: u8 = 0x06;
    pub const REFERENCE: u8 = 0x07;
    pub const ECMA_ARRAY: u8 = 0x08;
    pub const OBJECT_END: u8 = 0x09;
    pub const STRICT_ARRAY: u8 = 0x0A;
    pub const DATE: u8 = 0x0B;
    pub const LONG_STRING: u8 = 0x0C;
    pub const UNSUPPORTED: u8 = 0x0D;
    pub const RECORDSET: u8 = 0x0E;
    pub const XML_DOCUMENT: u8 = 0x0F;
    pub const TYPED_OBJECT: u8 = 0x10;
    pub const AVMPLUS_OBJECT: u8 = 0x11;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Boolean(bool),
    String(String),
    Object {
        class_name: Option<String>,
        entries: Vec<(String, Value)>,
    },
    Null,
    Undefined,
    EcmaArray(Vec<(String, Value)>),
    /// Sentinel terminating a key-value run; never surfaces from a
    /// well-formed top-level read.
    ObjectEnd,
    StrictArray(Vec<Value>),
    Date {
        millis: f64,
    },
    XmlDocument(String),
    /// A value that escalated to AMF3 via the avmplus-object marker.
    AvmPlus(amf3::Value),
}

impl Value {
    pub fn read_from<R>(reader: &mut R) -> AmfResult<Option<Self>>
    where
        R: io::Read,
    {
        Reader::new(reader).read()
    }

    pub fn try_as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::XmlDocument(s) => Some(s),
            Value::AvmPlus(v) => v.try_as_str(),
            _ => None,
        }
    }

    pub fn try_as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::AvmPlus(v) => v.try_as_f64(),
            _ => None,
        }
    }

    pub fn try_as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            Value::AvmPlus(v) => v.try_as_bool(),
            _ => None,
        }
    }

    pub fn is_map_like(&self) -> bool {
        matches!(
            self,
            Value::Object { .. } | Value::EcmaArray(_)
        ) || matches!(self, Value::AvmPlus(v) if v.is_map_like())
    }

    pub fn try_into_pairs(self) -> Result<Vec<(String, Value)>, Self> {
        match self {
            Value::Object { entries, .. } => Ok(entries),
            Value::EcmaArray(entries) => Ok(entries),
            other => Err(other),
        }
    }
}
