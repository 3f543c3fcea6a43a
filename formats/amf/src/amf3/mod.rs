use std::io;

use crate::{
    amf0,
    errors::{AmfError, AmfResult},
};

mod reader;
#[cfg(test)]
mod reader_test;
mod writer;

pub use self::reader::{Reader, read_string, read_value};
pub use self::writer::Writer;

/// @see: AMF 3 file format spec, 3.1 Overview
pub(crate) mod amf3_marker {
    pub const UNDEFINED: u8 = 0x00;
    pub const NULL: u8 = 0x01;
    pub const FALSE: u8 = 0x02;
    pub const TRUE: u8 = 0x03;
    pub const INTEGER: u8 = 0x04;
    pub const DOUBLE: u8 = 0x05;
    pub const STRING: u8 = 0x06;
    pub const XML_DOCUMENT: u8 = 0x07;
    pub const DATE: u8 = 0x08;
    pub const ARRAY: u8 = 0x09;
    pub const OBJECT: u8 = 0x0A;
    pub const XML: u8 = 0x0B;
    pub const BYTE_ARRAY: u8 = 0x0C;
    pub const VECTOR_INT: u8 = 0x0D;
    pub const VECTOR_UINT: u8 = 0x0E;
    pub const VECTOR_DOUBLE: u8 = 0x0F;
    pub const VECTOR_OBJECT: u8 = 0x10;
    pub const DICTIONARY: u8 = 0x11;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Undefined,
    Null,
    Boolean(bool),
    Integer(i32),
    Double(f64),
    String(String),
    XmlDocument(String),
    Xml(String),
    Date {
        millis: f64,
    },
    Array {
        assoc_entries: Vec<(String, Value)>,
        dense_entries: Vec<Value>,
    },
    Object {
        class_name: Option<String>,
        sealed_count: usize,
        entries: Vec<(String, Value)>,
    },
    ByteArray(Vec<u8>),
}

/// Class shape shared between objects; referenced through the trait table.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectTrait {
    pub class_name: Option<String>,
    pub is_dynamic: bool,
    pub fields: Vec<String>,
}

/// AMF3 reference storage: strings, complex values and traits. One record
/// spans a message body and is shared across AMF0 escalations.
#[derive(Debug, Default)]
pub struct ReferenceTables {
    pub(crate) strings: Vec<String>,
    pub(crate) complexes: Vec<Value>,
    pub(crate) traits: Vec<ObjectTrait>,
}

impl Value {
    pub fn read_from<R>(reader: &mut R) -> AmfResult<Option<Self>>
    where
        R: io::Read,
    {
        Reader::new(reader).read()
    }

    pub fn write_to<W>(&self, writer: &mut W) -> AmfResult<()>
    where
        W: io::Write,
    {
        Writer::new(writer).write(self)
    }

    pub fn try_as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::XmlDocument(s) => Some(s),
            Value::Xml(s) => Some(s),
            _ => None,
        }
    }

    pub fn try_as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(v) => Some(*v as f64),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn try_as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_map_like(&self) -> bool {
        match self {
            Value::Object { .. } => true,
            Value::Array { assoc_entries, .. } => !assoc_entries.is_empty(),
            _ => false,
        }
    }

    pub fn try_into_pairs(self) -> Result<Vec<(String, Value)>, Self> {
        match self {
            Value::Object { entries, .. } => Ok(entries),
            Value::Array { assoc_entries, .. } if !assoc_entries.is_empty() => Ok(assoc_entries),
            other => Err(other),
        }
    }

    /// Render this value as AMF0 where a faithful rendition exists.
    pub fn to_amf0(&self) -> AmfResult<amf0::Value> {
        let pairs_to_amf0 = |entries: &[(String, Value)]| -> AmfResult<Vec<(String, amf0::Value)>> {
            entries
                .iter()
                .map(|(k, v)| Ok((k.clone(), v.to_amf0()?)))
                .collect()
        };
        match self {
            Value::Undefined => Ok(amf0::Value::Undefined),
            Value::Null => Ok(amf0::Value::Null),
            Value::Boolean(b) => Ok(amf0::Value::Boolean(*b)),
            Value::Integer(i) => Ok(amf0::Value::Number(*i as f64)),
            Value::Double(d) => Ok(amf0::Value::Number(*d)),
            Value::String(s) => Ok(amf0::Value::String(s.clone())),
            Value::XmlDocument(s) => Ok(amf0::Value::XmlDocument(s.clone())),
            Value::Date { millis } => Ok(amf0::Value::Date { millis: *millis }),
            Value::Array {
                assoc_entries,
                dense_entries,
            } => {
                if assoc_entries.is_empty() {
                    let entries = dense_entries
                        .iter()
                        .map(|v| v.to_amf0())
                        .collect::<AmfResult<_>>()?;
                    Ok(amf0::Value::StrictArray(entries))
                } else {
                    let mut entries = pairs_to_amf0(assoc_entries)?;
                    for (index, value) in dense_entries.iter().enumerate() {
                        entries.push((index.to_string(), value.to_amf0()?));
                    }
                    Ok(amf0::Value::EcmaArray(entries))
                }
            }
            Value::Object {
                class_name,
                entries,
                ..
            } => Ok(amf0::Value::Object {
                class_name: class_name.clone(),
                entries: pairs_to_amf0(entries)?,
            }),
            Value::Xml(_) | Value::ByteArray(_) => Err(AmfError::NotExpressible {
                reason: "amf3 xml and byte arrays have no amf0 rendition".to_string(),
            }),
        }
    }
}
