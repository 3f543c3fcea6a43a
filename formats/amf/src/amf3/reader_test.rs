use super::{Reader, Value, Writer, amf3_marker};

fn decode(bytes: &[u8]) -> Option<Value> {
    Reader::new(&mut &bytes[..]).read().unwrap()
}

fn round_trip(value: Value) {
    let mut bytes = Vec::new();
    Writer::new(&mut bytes).write(&value).unwrap();
    assert_eq!(decode(&bytes), Some(value));
}

#[test]
fn markers_without_payload() {
    assert_eq!(decode(&[amf3_marker::UNDEFINED]), Some(Value::Undefined));
    assert_eq!(decode(&[amf3_marker::NULL]), Some(Value::Null));
    assert_eq!(decode(&[amf3_marker::FALSE]), Some(Value::Boolean(false)));
    assert_eq!(decode(&[amf3_marker::TRUE]), Some(Value::Boolean(true)));
}

#[test]
fn integer_u29_widths() {
    assert_eq!(decode(&[amf3_marker::INTEGER, 0x00]), Some(Value::Integer(0)));
    assert_eq!(
        decode(&[amf3_marker::INTEGER, 0x81, 0x00]),
        Some(Value::Integer(0b1000_0000))
    );
    assert_eq!(
        decode(&[amf3_marker::INTEGER, 0x81, 0x80, 0x00]),
        Some(Value::Integer(0b100_0000_0000_0000))
    );
    assert_eq!(
        decode(&[amf3_marker::INTEGER, 0xBF, 0xFF, 0xFF, 0xFF]),
        Some(Value::Integer(0x0FFF_FFFF))
    );
    assert_eq!(
        decode(&[amf3_marker::INTEGER, 0xC0, 0x80, 0x80, 0x00]),
        Some(Value::Integer(-0x1000_0000))
    );
}

#[test]
fn double() {
    let mut bytes = vec![amf3_marker::DOUBLE];
    bytes.extend_from_slice(&3.5f64.to_be_bytes());
    assert_eq!(decode(&bytes), Some(Value::Double(3.5)));
}

#[test]
fn string_reference() {
    // "ab" inline, then reference 0 twice over one reader
    let bytes = [
        amf3_marker::STRING,
        0x05,
        b'a',
        b'b',
        amf3_marker::STRING,
        0x00,
    ];
    let mut bytes_slice = &bytes[..];
    let mut reader = Reader::new(&mut bytes_slice);
    assert_eq!(
        reader.read().unwrap(),
        Some(Value::String("ab".to_string()))
    );
    assert_eq!(
        reader.read().unwrap(),
        Some(Value::String("ab".to_string()))
    );
}

#[test]
fn dense_array() {
    // [1, 2]: dense length 2, empty assoc terminator, two integers
    let bytes = [
        amf3_marker::ARRAY,
        0x05,
        0x01,
        amf3_marker::INTEGER,
        0x01,
        amf3_marker::INTEGER,
        0x02,
    ];
    assert_eq!(
        decode(&bytes),
        Some(Value::Array {
            assoc_entries: vec![],
            dense_entries: vec![Value::Integer(1), Value::Integer(2)],
        })
    );
}

#[test]
fn dynamic_object() {
    // anonymous dynamic object {"a": 1}
    let bytes = [
        amf3_marker::OBJECT,
        0x0B, // inline object, inline dynamic trait, zero sealed fields
        0x01, // empty class name
        0x03,
        b'a',
        amf3_marker::INTEGER,
        0x01,
        0x01, // dynamic terminator
    ];
    assert_eq!(
        decode(&bytes),
        Some(Value::Object {
            class_name: None,
            sealed_count: 0,
            entries: vec![("a".to_string(), Value::Integer(1))],
        })
    );
}

#[test]
fn byte_array() {
    let bytes = [amf3_marker::BYTE_ARRAY, 0x07, 0xDE, 0xAD, 0xBE];
    assert_eq!(
        decode(&bytes),
        Some(Value::ByteArray(vec![0xDE, 0xAD, 0xBE]))
    );
}

#[test]
fn vectors_are_unsupported() {
    assert!(Reader::new(&mut &[amf3_marker::VECTOR_INT, 0x01][..])
        .read()
        .is_err());
}

#[test]
fn writer_round_trips() {
    round_trip(Value::Integer(300));
    round_trip(Value::Double(2f64.powf(40f64)));
    round_trip(Value::String("onMetaData".to_string()));
    round_trip(Value::Array {
        assoc_entries: vec![("fps".to_string(), Value::Double(30.0))],
        dense_entries: vec![Value::Boolean(true)],
    });
    round_trip(Value::Object {
        class_name: None,
        sealed_count: 0,
        entries: vec![
            ("width".to_string(), Value::Integer(1920)),
            ("codec".to_string(), Value::String("avc1".to_string())),
        ],
    });
    round_trip(Value::ByteArray(vec![1, 2, 3, 4]));
}
