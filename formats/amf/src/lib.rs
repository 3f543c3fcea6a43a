use std::{collections::HashMap, io};

use errors::AmfResult;

pub mod amf0;
pub mod amf3;
pub mod errors;

/// Object encoding negotiated on an RTMP connection. A single message body
/// may still escalate from AMF0 to AMF3 mid-stream, see [`amf0::Reader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    Amf0,
    Amf3,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Amf0(amf0::Value),
    Amf3(amf3::Value),
}

impl Value {
    pub fn read_from<R>(reader: &mut R, version: Version) -> AmfResult<Option<Self>>
    where
        R: io::Read,
    {
        match version {
            Version::Amf0 => amf0::Reader::new(reader)
                .read()
                .map(|v| v.map(Value::Amf0)),
            Version::Amf3 => amf3::Reader::new(reader)
                .read()
                .map(|v| v.map(Value::Amf3)),
        }
    }

    pub fn write_to<W>(&self, writer: &mut W) -> AmfResult<()>
    where
        W: io::Write,
    {
        match self {
            Value::Amf0(v) => v.write_to(writer),
            Value::Amf3(v) => amf3::Writer::new(writer).write(v),
        }
    }

    pub fn try_as_str(&self) -> Option<&str> {
        match self {
            Value::Amf0(v) => v.try_as_str(),
            Value::Amf3(v) => v.try_as_str(),
        }
    }

    pub fn try_as_f64(&self) -> Option<f64> {
        match self {
            Value::Amf0(v) => v.try_as_f64(),
            Value::Amf3(v) => v.try_as_f64(),
        }
    }

    pub fn try_as_bool(&self) -> Option<bool> {
        match self {
            Value::Amf0(v) => v.try_as_bool(),
            Value::Amf3(v) => v.try_as_bool(),
        }
    }

    /// Key-value view for map-like values (objects and associative arrays).
    pub fn try_into_pairs(self) -> Result<Vec<(String, Value)>, Self> {
        match self {
            Value::Amf0(v) => match v.try_into_pairs() {
                Ok(pairs) => Ok(pairs
                    .into_iter()
                    .map(|(k, v)| (k, Value::Amf0(v)))
                    .collect()),
                Err(v) => Err(Value::Amf0(v)),
            },
            Value::Amf3(v) => match v.try_into_pairs() {
                Ok(pairs) => Ok(pairs
                    .into_iter()
                    .map(|(k, v)| (k, Value::Amf3(v)))
                    .collect()),
                Err(v) => Err(Value::Amf3(v)),
            },
        }
    }

    pub fn try_into_map(self) -> Result<HashMap<String, Value>, Self> {
        self.try_into_pairs()
            .map(|pairs| pairs.into_iter().collect())
    }

    pub fn is_map_like(&self) -> bool {
        match self {
            Value::Amf0(v) => v.is_map_like(),
            Value::Amf3(v) => v.is_map_like(),
        }
    }

    /// Render as an AMF0 value, converting AMF3 where a faithful rendition
    /// exists. Used when a mixed-encoding body has to be re-serialized as
    /// plain AMF0.
    pub fn to_amf0(&self) -> AmfResult<amf0::Value> {
        match self {
            Value::Amf0(v) => Ok(v.clone()),
            Value::Amf3(v) => v.to_amf0(),
        }
    }
}

impl Value {
    /// Wrap an AMF0-decoded value, unwrapping an escalated AMF3 payload to
    /// its own encoding.
    pub fn from_amf0(value: amf0::Value) -> Value {
        match value {
            amf0::Value::AvmPlus(v) => Value::Amf3(v),
            value => Value::Amf0(value),
        }
    }
}

impl From<amf0::Value> for Value {
    fn from(v: amf0::Value) -> Value {
        Value::Amf0(v)
    }
}

impl From<amf3::Value> for Value {
    fn from(v: amf3::Value) -> Value {
        Value::Amf3(v)
    }
}

pub fn string<S: Into<String>>(value: S, version: Version) -> Value {
    match version {
        Version::Amf0 => Value::Amf0(amf0::Value::String(value.into())),
        Version::Amf3 => Value::Amf3(amf3::Value::String(value.into())),
    }
}

pub fn number<N: Into<f64>>(value: N, version: Version) -> Value {
    match version {
        Version::Amf0 => Value::Amf0(amf0::Value::Number(value.into())),
        Version::Amf3 => Value::Amf3(amf3::Value::Double(value.into())),
    }
}

pub fn boolean(value: bool, version: Version) -> Value {
    match version {
        Version::Amf0 => Value::Amf0(amf0::Value::Boolean(value)),
        Version::Amf3 => Value::Amf3(amf3::Value::Boolean(value)),
    }
}

pub fn null(version: Version) -> Value {
    match version {
        Version::Amf0 => Value::Amf0(amf0::Value::Null),
        Version::Amf3 => Value::Amf3(amf3::Value::Null),
    }
}
