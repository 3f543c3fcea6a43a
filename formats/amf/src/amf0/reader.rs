use std::io;

use byteorder::{BigEndian, ReadBytesExt};

use crate::{
    amf3,
    errors::{AmfError, AmfResult},
};

use super::{Value, amf0_marker};

/// AMF0 value reader over a byte stream.
///
/// A single `Reader` is meant to live for one message body: the AMF0
/// reference table and the AMF3 reference tables both span every value read
/// through it, so an escalated value (marker 0x11) shares string, object and
/// trait references with any later escalation in the same body.
#[derive(Debug)]
pub struct Reader<R> {
    inner: R,
    seen_objects: Vec<Value>,
    amf3_tables: amf3::ReferenceTables,
}

impl<R> Reader<R> {
    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn inner_mut(&mut self) -> &mut R {
        &mut self.inner
    }
}

impl<R> Reader<R>
where
    R: io::Read,
{
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            seen_objects: Vec::new(),
            amf3_tables: amf3::ReferenceTables::default(),
        }
    }

    /// Read one value. `Ok(None)` means the stream ended exactly on a value
    /// boundary; running out of bytes inside a value is an error.
    pub fn read(&mut self) -> AmfResult<Option<Value>> {
        let marker = match self.inner.read_u8() {
            Ok(marker) => marker,
            Err(_) => return Ok(None),
        };
        self.read_marked(marker).map(Some)
    }

    pub fn read_all(&mut self) -> AmfResult<Vec<Value>> {
        let mut result = Vec::new();
        while let Some(value) = self.read()? {
            result.push(value);
        }
        Ok(result)
    }

    fn read_marked(&mut self, marker: u8) -> AmfResult<Value> {
        match marker {
            amf0_marker::NUMBER => self.read_number(),
            amf0_marker::BOOLEAN => self.read_boolean(),
            amf0_marker::STRING => self.read_short_string().map(Value::String),
            amf0_marker::OBJECT => self.read_anonymous_object(),
            amf0_marker::MOVIECLIP => Err(AmfError::Unsupported { marker }),
            amf0_marker::NULL => Ok(Value::Null),
            amf0_marker::UNDEFINED => Ok(Value::Undefined),
            amf0_marker::REFERENCE => self.read_reference(),
            amf0_marker::ECMA_ARRAY => self.read_ecma_array(),
            amf0_marker::OBJECT_END => Ok(Value::ObjectEnd),
            amf0_marker::STRICT_ARRAY => self.read_strict_array(),
            amf0_marker::DATE => self.read_date(),
            amf0_marker::LONG_STRING => self.read_long_string().map(Value::String),
            amf0_marker::UNSUPPORTED => Err(AmfError::Unsupported { marker }),
            amf0_marker::RECORDSET => Err(AmfError::Unsupported { marker }),
            amf0_marker::XML_DOCUMENT => self.read_long_string().map(Value::XmlDocument),
            amf0_marker::TYPED_OBJECT => self.read_typed_object(),
            amf0_marker::AVMPLUS_OBJECT => self.read_avm_plus(),
            _ => Err(AmfError::Unknown { marker }),
        }
    }

    fn read_utf8(&mut self, len: usize) -> AmfResult<String> {
        let mut buffer = vec![0; len];
        self.inner.read_exact(&mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// A bare u16-length UTF-8 string without a type marker. Shared-object
    /// envelopes and status events transmit names this way.
    pub fn read_raw_string(&mut self) -> AmfResult<String> {
        let len = self.inner.read_u16::<BigEndian>()?;
        self.read_utf8(len as usize)
    }

    fn read_number(&mut self) -> AmfResult<Value> {
        Ok(Value::Number(self.inner.read_f64::<BigEndian>()?))
    }

    fn read_boolean(&mut self) -> AmfResult<Value> {
        Ok(Value::Boolean(self.inner.read_u8()? != 0))
    }

    fn read_short_string(&mut self) -> AmfResult<String> {
        let len = self.inner.read_u16::<BigEndian>()?;
        self.read_utf8(len as usize)
    }

    fn read_long_string(&mut self) -> AmfResult<String> {
        let len = self.inner.read_u32::<BigEndian>()?;
        self.read_utf8(len as usize)
    }

    fn read_pairs(&mut self) -> AmfResult<Vec<(String, Value)>> {
        let mut entries = Vec::new();
        loop {
            let key = self.read_raw_string()?;
            match self.read()? {
                Some(Value::ObjectEnd) if key.is_empty() => break,
                Some(value) => entries.push((key, value)),
                None => {
                    return Err(AmfError::Io(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "object terminator missing",
                    )));
                }
            }
        }
        Ok(entries)
    }

    fn read_anonymous_object(&mut self) -> AmfResult<Value> {
        self.record_complex(|this| {
            let entries = this.read_pairs()?;
            Ok(Value::Object {
                class_name: None,
                entries,
            })
        })
    }

    fn read_typed_object(&mut self) -> AmfResult<Value> {
        self.record_complex(|this| {
            let class_name = this.read_raw_string()?;
            let entries = this.read_pairs()?;
            Ok(Value::Object {
                class_name: Some(class_name),
                entries,
            })
        })
    }

    fn read_reference(&mut self) -> AmfResult<Value> {
        let index = self.inner.read_u16::<BigEndian>()? as usize;
        self.seen_objects
            .get(index)
            .ok_or(AmfError::OutOfRangeReference { index })
            .and_then(|v| match v {
                Value::Null => Err(AmfError::CircularReference { index }),
                _ => Ok(v.clone()),
            })
    }

    fn read_ecma_array(&mut self) -> AmfResult<Value> {
        self.record_complex(|this| {
            // the declared entry count is advisory; the end marker is
            // authoritative
            let _count = this.inner.read_u32::<BigEndian>()?;
            Ok(Value::EcmaArray(this.read_pairs()?))
        })
    }

    fn read_strict_array(&mut self) -> AmfResult<Value> {
        self.record_complex(|this| {
            let len = this.inner.read_u32::<BigEndian>()? as usize;
            let entries = (0..len)
                .map(|_| match this.read()? {
                    Some(value) => Ok(value),
                    None => Err(AmfError::Io(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "strict array ended early",
                    ))),
                })
                .collect::<AmfResult<_>>()?;
            Ok(Value::StrictArray(entries))
        })
    }

    fn read_date(&mut self) -> AmfResult<Value> {
        let millis = self.inner.read_f64::<BigEndian>()?;
        if !(millis.is_finite() && millis.is_sign_positive()) {
            return Err(AmfError::InvalidDate {
                milliseconds: millis,
            });
        }
        let offset = self.inner.read_i16::<BigEndian>()?;
        if offset != 0 {
            return Err(AmfError::UnexpectedTimeZone { offset });
        }
        Ok(Value::Date { millis })
    }

    /// Escalate to AMF3 for one value. All escalations through this reader
    /// share one set of AMF3 reference tables.
    fn read_avm_plus(&mut self) -> AmfResult<Value> {
        match amf3::read_value(&mut self.inner, &mut self.amf3_tables)? {
            Some(v) => Ok(Value::AvmPlus(v)),
            None => Err(AmfError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "avmplus marker without a value",
            ))),
        }
    }

    fn record_complex<F>(&mut self, f: F) -> AmfResult<Value>
    where
        F: FnOnce(&mut Self) -> AmfResult<Value>,
    {
        let index = self.seen_objects.len();
        self.seen_objects.push(Value::Null);
        let result = f(self)?;
        self.seen_objects[index] = result.clone();
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amf3;

    fn decode(bytes: &[u8]) -> AmfResult<Option<Value>> {
        Reader::new(&mut &bytes[..]).read()
    }

    #[test]
    fn number() {
        let mut bytes = vec![amf0_marker::NUMBER];
        bytes.extend_from_slice(&1234.5f64.to_be_bytes());
        assert_eq!(decode(&bytes).unwrap(), Some(Value::Number(1234.5)));
    }

    #[test]
    fn boolean() {
        assert_eq!(
            decode(&[amf0_marker::BOOLEAN, 0x01]).unwrap(),
            Some(Value::Boolean(true))
        );
        assert_eq!(
            decode(&[amf0_marker::BOOLEAN, 0x00]).unwrap(),
            Some(Value::Boolean(false))
        );
    }

    #[test]
    fn short_string() {
        let bytes = [amf0_marker::STRING, 0x00, 0x03, b'a', b'p', b'p'];
        assert_eq!(
            decode(&bytes).unwrap(),
            Some(Value::String("app".to_string()))
        );
    }

    #[test]
    fn anonymous_object() {
        let mut bytes = vec![amf0_marker::OBJECT];
        bytes.extend_from_slice(&[0x00, 0x03]);
        bytes.extend_from_slice(b"app");
        bytes.push(amf0_marker::STRING);
        bytes.extend_from_slice(&[0x00, 0x04]);
        bytes.extend_from_slice(b"live");
        bytes.extend_from_slice(&[0x00, 0x00, amf0_marker::OBJECT_END]);

        assert_eq!(
            decode(&bytes).unwrap(),
            Some(Value::Object {
                class_name: None,
                entries: vec![(
                    "app".to_string(),
                    Value::String("live".to_string())
                )],
            })
        );
    }

    #[test]
    fn strict_array() {
        let mut bytes = vec![amf0_marker::STRICT_ARRAY, 0x00, 0x00, 0x00, 0x02];
        bytes.push(amf0_marker::NUMBER);
        bytes.extend_from_slice(&1f64.to_be_bytes());
        bytes.push(amf0_marker::NULL);
        assert_eq!(
            decode(&bytes).unwrap(),
            Some(Value::StrictArray(vec![Value::Number(1.0), Value::Null]))
        );
    }

    #[test]
    fn escalates_to_amf3_on_avmplus_marker() {
        // 0x11 followed by an AMF3 integer 7
        let bytes = [amf0_marker::AVMPLUS_OBJECT, 0x04, 0x07];
        assert_eq!(
            decode(&bytes).unwrap(),
            Some(Value::AvmPlus(amf3::Value::Integer(7)))
        );
    }

    #[test]
    fn escalations_share_reference_tables() {
        // two escalated strings, the second referencing the first
        let mut bytes = Vec::new();
        bytes.push(amf0_marker::AVMPLUS_OBJECT);
        bytes.extend_from_slice(&[0x06, 0x07]); // string, inline, len 3
        bytes.extend_from_slice(b"foo");
        bytes.push(amf0_marker::AVMPLUS_OBJECT);
        bytes.extend_from_slice(&[0x06, 0x00]); // string, reference 0

        let mut bytes_slice = &bytes[..];
        let mut reader = Reader::new(&mut bytes_slice);
        assert_eq!(
            reader.read().unwrap(),
            Some(Value::AvmPlus(amf3::Value::String("foo".to_string())))
        );
        assert_eq!(
            reader.read().unwrap(),
            Some(Value::AvmPlus(amf3::Value::String("foo".to_string())))
        );
    }

    #[test]
    fn eof_at_value_boundary_is_none() {
        assert_eq!(decode(&[]).unwrap(), None);
    }

    #[test]
    fn truncated_value_is_an_error() {
        let bytes = [amf0_marker::STRING, 0x00, 0x05, b'a'];
        assert!(decode(&bytes).is_err());
    }
}
