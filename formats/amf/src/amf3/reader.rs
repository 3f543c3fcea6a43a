use std::io;

use byteorder::{BigEndian, ReadBytesExt};

use crate::errors::{AmfError, AmfResult};

use super::{ObjectTrait, ReferenceTables, Value, amf3_marker};

enum SizeOrIndex {
    Size(usize),
    Index(usize),
}

/// Read one AMF3 value using caller-owned reference tables. This is the
/// entry point the AMF0 reader uses when a body escalates encodings: the
/// tables outlive any single value and are shared across escalations.
pub fn read_value<R>(reader: &mut R, tables: &mut ReferenceTables) -> AmfResult<Option<Value>>
where
    R: io::Read,
{
    let marker = match reader.read_u8() {
        Ok(marker) => marker,
        Err(_) => return Ok(None),
    };
    read_marked(reader, tables, marker).map(Some)
}

fn read_marked<R: io::Read>(
    reader: &mut R,
    tables: &mut ReferenceTables,
    marker: u8,
) -> AmfResult<Value> {
    match marker {
        amf3_marker::UNDEFINED => Ok(Value::Undefined),
        amf3_marker::NULL => Ok(Value::Null),
        amf3_marker::FALSE => Ok(Value::Boolean(false)),
        amf3_marker::TRUE => Ok(Value::Boolean(true)),
        amf3_marker::INTEGER => read_integer(reader),
        amf3_marker::DOUBLE => Ok(Value::Double(reader.read_f64::<BigEndian>()?)),
        amf3_marker::STRING => read_string(reader, tables).map(Value::String),
        amf3_marker::XML_DOCUMENT => read_complex(reader, tables, |reader, _, size| {
            read_utf8(reader, size).map(Value::XmlDocument)
        }),
        amf3_marker::DATE => read_complex(reader, tables, |reader, _, _| {
            let millis = reader.read_f64::<BigEndian>()?;
            if millis.is_finite() && millis.is_sign_positive() {
                Ok(Value::Date { millis })
            } else {
                Err(AmfError::InvalidDate {
                    milliseconds: millis,
                })
            }
        }),
        amf3_marker::ARRAY => read_complex(reader, tables, read_array),
        amf3_marker::OBJECT => read_complex(reader, tables, read_object),
        amf3_marker::XML => read_complex(reader, tables, |reader, _, size| {
            read_utf8(reader, size).map(Value::Xml)
        }),
        amf3_marker::BYTE_ARRAY => read_complex(reader, tables, |reader, _, size| {
            read_bytes(reader, size).map(Value::ByteArray)
        }),
        amf3_marker::VECTOR_INT
        | amf3_marker::VECTOR_UINT
        | amf3_marker::VECTOR_DOUBLE
        | amf3_marker::VECTOR_OBJECT
        | amf3_marker::DICTIONARY => Err(AmfError::Unsupported { marker }),
        _ => Err(AmfError::Unknown { marker }),
    }
}

fn read_u29<R: io::Read>(reader: &mut R) -> AmfResult<u32> {
    let mut result: u32 = 0;
    for _ in 0..3 {
        let byte = reader.read_u8()?;
        result = (result << 7) | ((byte as u32) & 0b0111_1111);
        if (byte & 0b1000_0000) == 0 {
            return Ok(result);
        }
    }
    let byte = reader.read_u8()?;
    Ok((result << 8) | (byte as u32))
}

fn read_size_or_index<R: io::Read>(reader: &mut R) -> AmfResult<SizeOrIndex> {
    let u29 = read_u29(reader)? as usize;
    if (u29 & 0b1) == 0 {
        Ok(SizeOrIndex::Index(u29 >> 1))
    } else {
        Ok(SizeOrIndex::Size(u29 >> 1))
    }
}

fn read_integer<R: io::Read>(reader: &mut R) -> AmfResult<Value> {
    let raw = read_u29(reader)? as i32;
    let value = if raw >= (1 << 28) { raw - (1 << 29) } else { raw };
    Ok(Value::Integer(value))
}

fn read_bytes<R: io::Read>(reader: &mut R, len: usize) -> AmfResult<Vec<u8>> {
    let mut buf = vec![0; len];
    reader.read_exact(&mut buf)?;
    Ok(buf)
}

fn read_utf8<R: io::Read>(reader: &mut R, len: usize) -> AmfResult<String> {
    Ok(String::from_utf8(read_bytes(reader, len)?)?)
}

/// A UTF-8-vr string (u29 length/reference plus bytes) without a type
/// marker, as shared-object envelopes transmit names.
pub fn read_string<R: io::Read>(reader: &mut R, tables: &mut ReferenceTables) -> AmfResult<String> {
    match read_size_or_index(reader)? {
        SizeOrIndex::Index(index) => tables
            .strings
            .get(index)
            .cloned()
            .ok_or(AmfError::OutOfRangeReference { index }),
        SizeOrIndex::Size(size) => {
            let value = read_utf8(reader, size)?;
            if !value.is_empty() {
                tables.strings.push(value.clone());
            }
            Ok(value)
        }
    }
}

/// Complex values participate in the object reference table; a placeholder
/// occupies the slot while the body is read so self references are caught
/// instead of looping.
fn read_complex<R, F>(reader: &mut R, tables: &mut ReferenceTables, f: F) -> AmfResult<Value>
where
    R: io::Read,
    F: FnOnce(&mut R, &mut ReferenceTables, usize) -> AmfResult<Value>,
{
    match read_size_or_index(reader)? {
        SizeOrIndex::Index(index) => tables
            .complexes
            .get(index)
            .ok_or(AmfError::OutOfRangeReference { index })
            .and_then(|v| match v {
                Value::Null => Err(AmfError::CircularReference { index }),
                _ => Ok(v.clone()),
            }),
        SizeOrIndex::Size(size) => {
            let index = tables.complexes.len();
            tables.complexes.push(Value::Null);
            let result = f(reader, tables, size)?;
            tables.complexes[index] = result.clone();
            Ok(result)
        }
    }
}

fn read_array<R: io::Read>(
    reader: &mut R,
    tables: &mut ReferenceTables,
    dense_len: usize,
) -> AmfResult<Value> {
    let mut assoc_entries = Vec::new();
    loop {
        let key = read_string(reader, tables)?;
        if key.is_empty() {
            break;
        }
        let value = expect_value(reader, tables)?;
        assoc_entries.push((key, value));
    }
    let dense_entries = (0..dense_len)
        .map(|_| expect_value(reader, tables))
        .collect::<AmfResult<_>>()?;
    Ok(Value::Array {
        assoc_entries,
        dense_entries,
    })
}

fn read_trait<R: io::Read>(
    reader: &mut R,
    tables: &mut ReferenceTables,
    header: usize,
) -> AmfResult<ObjectTrait> {
    if (header & 0b1) == 0 {
        let index = header >> 1;
        return tables
            .traits
            .get(index)
            .cloned()
            .ok_or(AmfError::OutOfRangeReference { index });
    }
    if (header & 0b10) != 0 {
        let class_name = read_string(reader, tables)?;
        return Err(AmfError::UnsupportedExternalizable { name: class_name });
    }
    let is_dynamic = (header & 0b100) != 0;
    let field_count = header >> 3;
    let class_name = read_string(reader, tables)?;
    let fields = (0..field_count)
        .map(|_| read_string(reader, tables))
        .collect::<AmfResult<_>>()?;
    let result = ObjectTrait {
        class_name: if class_name.is_empty() {
            None
        } else {
            Some(class_name)
        },
        is_dynamic,
        fields,
    };
    tables.traits.push(result.clone());
    Ok(result)
}

fn read_object<R: io::Read>(
    reader: &mut R,
    tables: &mut ReferenceTables,
    header: usize,
) -> AmfResult<Value> {
    let trait_def = read_trait(reader, tables, header)?;
    let mut entries: Vec<(String, Value)> = Vec::with_capacity(trait_def.fields.len());
    for field in &trait_def.fields {
        let value = expect_value(reader, tables)?;
        entries.push((field.clone(), value));
    }
    let sealed_count = entries.len();
    if trait_def.is_dynamic {
        loop {
            let key = read_string(reader, tables)?;
            if key.is_empty() {
                break;
            }
            let value = expect_value(reader, tables)?;
            entries.push((key, value));
        }
    }
    Ok(Value::Object {
        class_name: trait_def.class_name,
        sealed_count,
        entries,
    })
}

fn expect_value<R: io::Read>(reader: &mut R, tables: &mut ReferenceTables) -> AmfResult<Value> {
    match read_value(reader, tables)? {
        Some(value) => Ok(value),
        None => Err(AmfError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "value ended early",
        ))),
    }
}

#[derive(Debug)]
pub struct Reader<R> {
    inner: R,
    tables: ReferenceTables,
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
            tables: ReferenceTables::default(),
        }
    }

    pub fn read(&mut self) -> AmfResult<Option<Value>> {
        read_value(&mut self.inner, &mut self.tables)
    }

    pub fn read_all(&mut self) -> AmfResult<Vec<Value>> {
        let mut result = Vec::new();
        while let Some(value) = self.read()? {
            result.push(value);
        }
        Ok(result)
    }
}
