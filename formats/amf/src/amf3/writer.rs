use std::io;

use byteorder::{BigEndian, WriteBytesExt};

use crate::errors::{AmfError, AmfResult};

use super::{Value, amf3_marker};

/// AMF3 value writer. Values are always written inline; reference tables are
/// a decode-side concern here.
#[derive(Debug)]
pub struct Writer<W> {
    inner: W,
}

impl<W> Writer<W>
where
    W: io::Write,
{
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn write(&mut self, value: &Value) -> AmfResult<()> {
        match value {
            Value::Undefined => Ok(self.inner.write_u8(amf3_marker::UNDEFINED)?),
            Value::Null => Ok(self.inner.write_u8(amf3_marker::NULL)?),
            Value::Boolean(false) => Ok(self.inner.write_u8(amf3_marker::FALSE)?),
            Value::Boolean(true) => Ok(self.inner.write_u8(amf3_marker::TRUE)?),
            Value::Integer(v) => self.write_integer(*v),
            Value::Double(v) => self.write_double(*v),
            Value::String(s) => {
                self.inner.write_u8(amf3_marker::STRING)?;
                self.write_utf8(s)
            }
            Value::XmlDocument(s) => {
                self.inner.write_u8(amf3_marker::XML_DOCUMENT)?;
                self.write_utf8(s)
            }
            Value::Xml(s) => {
                self.inner.write_u8(amf3_marker::XML)?;
                self.write_utf8(s)
            }
            Value::Date { millis } => {
                self.inner.write_u8(amf3_marker::DATE)?;
                self.write_u29(0b1)?;
                Ok(self.inner.write_f64::<BigEndian>(*millis)?)
            }
            Value::Array {
                assoc_entries,
                dense_entries,
            } => self.write_array(assoc_entries, dense_entries),
            Value::Object {
                class_name,
                sealed_count,
                entries,
            } => self.write_object(class_name.as_deref(), *sealed_count, entries),
            Value::ByteArray(bytes) => {
                self.inner.write_u8(amf3_marker::BYTE_ARRAY)?;
                self.write_u29(((bytes.len() as u32) << 1) | 1)?;
                Ok(self.inner.write_all(bytes)?)
            }
        }
    }

    fn write_u29(&mut self, value: u32) -> AmfResult<()> {
        if value >= (1 << 29) {
            return Err(AmfError::U29OutOfRange {
                value: value as u64,
            });
        }
        if value < 0x80 {
            self.inner.write_u8(value as u8)?;
        } else if value < 0x4000 {
            self.inner.write_u8(((value >> 7) as u8) | 0x80)?;
            self.inner.write_u8((value & 0x7F) as u8)?;
        } else if value < 0x20_0000 {
            self.inner.write_u8(((value >> 14) as u8) | 0x80)?;
            self.inner.write_u8((((value >> 7) & 0x7F) as u8) | 0x80)?;
            self.inner.write_u8((value & 0x7F) as u8)?;
        } else {
            self.inner.write_u8(((value >> 22) as u8) | 0x80)?;
            self.inner.write_u8((((value >> 15) & 0x7F) as u8) | 0x80)?;
            self.inner.write_u8((((value >> 8) & 0x7F) as u8) | 0x80)?;
            self.inner.write_u8((value & 0xFF) as u8)?;
        }
        Ok(())
    }

    fn write_utf8(&mut self, value: &str) -> AmfResult<()> {
        self.write_u29(((value.len() as u32) << 1) | 1)?;
        self.inner.write_all(value.as_bytes())?;
        Ok(())
    }

    fn write_integer(&mut self, value: i32) -> AmfResult<()> {
        // the u29 integer range; anything wider degrades to a double
        if (-0x1000_0000..0x1000_0000).contains(&value) {
            self.inner.write_u8(amf3_marker::INTEGER)?;
            self.write_u29((value as u32) & 0x1FFF_FFFF)
        } else {
            self.write_double(value as f64)
        }
    }

    fn write_double(&mut self, value: f64) -> AmfResult<()> {
        self.inner.write_u8(amf3_marker::DOUBLE)?;
        Ok(self.inner.write_f64::<BigEndian>(value)?)
    }

    fn write_array(
        &mut self,
        assoc_entries: &[(String, Value)],
        dense_entries: &[Value],
    ) -> AmfResult<()> {
        self.inner.write_u8(amf3_marker::ARRAY)?;
        self.write_u29(((dense_entries.len() as u32) << 1) | 1)?;
        for (key, value) in assoc_entries {
            self.write_utf8(key)?;
            self.write(value)?;
        }
        self.write_utf8("")?;
        for value in dense_entries {
            self.write(value)?;
        }
        Ok(())
    }

    fn write_object(
        &mut self,
        class_name: Option<&str>,
        sealed_count: usize,
        entries: &[(String, Value)],
    ) -> AmfResult<()> {
        let sealed_count = sealed_count.min(entries.len());
        let is_dynamic = sealed_count < entries.len();
        self.inner.write_u8(amf3_marker::OBJECT)?;
        let header =
            ((sealed_count as u32) << 4) | if is_dynamic { 0b1000 } else { 0 } | 0b011;
        self.write_u29(header)?;
        self.write_utf8(class_name.unwrap_or(""))?;
        for (key, _) in entries.iter().take(sealed_count) {
            self.write_utf8(key)?;
        }
        for (_, value) in entries.iter().take(sealed_count) {
            self.write(value)?;
        }
        if is_dynamic {
            for (key, value) in entries.iter().skip(sealed_count) {
                self.write_utf8(key)?;
                self.write(value)?;
            }
            self.write_utf8("")?;
        }
        Ok(())
    }
}
