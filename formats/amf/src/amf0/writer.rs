use std::{collections::HashMap, io};

use byteorder::{BigEndian, WriteBytesExt};
use utils::traits::writer::WriteTo;

use crate::{
    amf3,
    errors::{AmfError, AmfResult},
};

use super::{Value, amf0_marker};

impl<W: io::Write> WriteTo<W> for Value {
    type Error = AmfError;
    fn write_to(&self, writer: &mut W) -> Result<(), Self::Error> {
        match self {
            Value::Number(n) => Self::write_number(writer, *n),
            Value::Boolean(b) => Self::write_boolean(writer, *b),
            Value::String(s) => Self::write_string(writer, s),
            Value::Object {
                class_name,
                entries,
            } => Self::write_object(writer, class_name.as_deref(), entries),
            Value::Null => Self::write_null(writer),
            Value::Undefined => Self::write_undefined(writer),
            Value::EcmaArray(entries) => Self::write_ecma_array(writer, entries),
            Value::ObjectEnd => Self::write_object_end(writer),
            Value::StrictArray(entries) => Self::write_strict_array(writer, entries),
            Value::Date { millis } => Self::write_date(writer, *millis),
            Value::XmlDocument(xml) => Self::write_xml_document(writer, xml),
            Value::AvmPlus(value) => Self::write_avm_plus(writer, value),
        }
    }
}

impl Value {
    pub fn write_to<W: io::Write>(&self, writer: &mut W) -> AmfResult<()> {
        WriteTo::write_to(self, writer)
    }

    pub fn write_number<W: io::Write>(writer: &mut W, v: f64) -> AmfResult<()> {
        writer.write_u8(amf0_marker::NUMBER)?;
        writer.write_f64::<BigEndian>(v)?;
        Ok(())
    }

    pub fn write_boolean<W: io::Write>(writer: &mut W, v: bool) -> AmfResult<()> {
        writer.write_u8(amf0_marker::BOOLEAN)?;
        writer.write_u8(v as u8)?;
        Ok(())
    }

    /// A bare u16-length UTF-8 string without a type marker; the inverse of
    /// [`super::Reader::read_raw_string`].
    pub fn write_raw_string<W: io::Write>(writer: &mut W, v: &str) -> AmfResult<()> {
        if v.len() > 0xFFFF {
            return Err(AmfError::U29OutOfRange {
                value: v.len() as u64,
            });
        }
        writer.write_u16::<BigEndian>(v.len() as u16)?;
        writer.write_all(v.as_bytes())?;
        Ok(())
    }

    pub fn write_string<W: io::Write>(writer: &mut W, v: &str) -> AmfResult<()> {
        if v.len() <= 0xFFFF {
            writer.write_u8(amf0_marker::STRING)?;
            Self::write_raw_string(writer, v)?;
        } else {
            writer.write_u8(amf0_marker::LONG_STRING)?;
            writer.write_u32::<BigEndian>(v.len() as u32)?;
            writer.write_all(v.as_bytes())?;
        }
        Ok(())
    }

    fn write_pairs<W: io::Write>(writer: &mut W, entries: &[(String, Value)]) -> AmfResult<()> {
        for (key, value) in entries {
            Self::write_raw_string(writer, key)?;
            value.write_to(writer)?;
        }
        writer.write_u16::<BigEndian>(0)?;
        writer.write_u8(amf0_marker::OBJECT_END)?;
        Ok(())
    }

    pub fn write_object<W: io::Write>(
        writer: &mut W,
        class_name: Option<&str>,
        entries: &[(String, Value)],
    ) -> AmfResult<()> {
        match class_name {
            Some(name) => {
                writer.write_u8(amf0_marker::TYPED_OBJECT)?;
                Self::write_raw_string(writer, name)?;
            }
            None => writer.write_u8(amf0_marker::OBJECT)?,
        }
        Self::write_pairs(writer, entries)
    }

    pub fn write_map<W: io::Write>(
        writer: &mut W,
        entries: &HashMap<String, Value>,
    ) -> AmfResult<()> {
        let pairs: Vec<(String, Value)> = entries
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Self::write_object(writer, None, &pairs)
    }

    pub fn write_null<W: io::Write>(writer: &mut W) -> AmfResult<()> {
        writer.write_u8(amf0_marker::NULL)?;
        Ok(())
    }

    pub fn write_undefined<W: io::Write>(writer: &mut W) -> AmfResult<()> {
        writer.write_u8(amf0_marker::UNDEFINED)?;
        Ok(())
    }

    pub fn write_ecma_array<W: io::Write>(
        writer: &mut W,
        entries: &[(String, Value)],
    ) -> AmfResult<()> {
        writer.write_u8(amf0_marker::ECMA_ARRAY)?;
        writer.write_u32::<BigEndian>(entries.len() as u32)?;
        Self::write_pairs(writer, entries)
    }

    fn write_object_end<W: io::Write>(writer: &mut W) -> AmfResult<()> {
        writer.write_u16::<BigEndian>(0)?;
        writer.write_u8(amf0_marker::OBJECT_END)?;
        Ok(())
    }

    pub fn write_strict_array<W: io::Write>(writer: &mut W, entries: &[Value]) -> AmfResult<()> {
        writer.write_u8(amf0_marker::STRICT_ARRAY)?;
        writer.write_u32::<BigEndian>(entries.len() as u32)?;
        for value in entries {
            value.write_to(writer)?;
        }
        Ok(())
    }

    pub fn write_date<W: io::Write>(writer: &mut W, millis: f64) -> AmfResult<()> {
        writer.write_u8(amf0_marker::DATE)?;
        writer.write_f64::<BigEndian>(millis)?;
        writer.write_i16::<BigEndian>(0)?;
        Ok(())
    }

    pub fn write_xml_document<W: io::Write>(writer: &mut W, xml: &str) -> AmfResult<()> {
        writer.write_u8(amf0_marker::XML_DOCUMENT)?;
        writer.write_u32::<BigEndian>(xml.len() as u32)?;
        writer.write_all(xml.as_bytes())?;
        Ok(())
    }

    fn write_avm_plus<W: io::Write>(writer: &mut W, value: &amf3::Value) -> AmfResult<()> {
        writer.write_u8(amf0_marker::AVMPLUS_OBJECT)?;
        amf3::Writer::new(writer).write(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amf0::Reader;

    fn round_trip(value: Value) {
        let mut bytes = Vec::new();
        value.write_to(&mut bytes).unwrap();
        let decoded = Reader::new(&mut &bytes[..]).read().unwrap();
        assert_eq!(decoded, Some(value));
    }

    #[test]
    fn object_survives_rewrite() {
        round_trip(Value::Object {
            class_name: None,
            entries: vec![
                ("width".to_string(), Value::Number(1280.0)),
                ("codec".to_string(), Value::String("avc1".to_string())),
                ("stereo".to_string(), Value::Boolean(true)),
            ],
        });
    }

    #[test]
    fn ecma_array_survives_rewrite() {
        round_trip(Value::EcmaArray(vec![(
            "duration".to_string(),
            Value::Number(0.0),
        )]));
    }

    #[test]
    fn typed_object_keeps_class_name() {
        round_trip(Value::Object {
            class_name: Some("org.example.Box".to_string()),
            entries: vec![("size".to_string(), Value::Number(3.0))],
        });
    }
}
