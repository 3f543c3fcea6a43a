use std::io::Cursor;

use amf::{Version, amf0, amf3};
use byteorder::{BigEndian, ReadBytesExt};

use crate::message::errors::{MessageError, MessageResult};

use super::{
    SharedObjectEvent, SharedObjectEventBody, SharedObjectEventType, SharedObjectMessage,
};

/// Decode a shared-object envelope: name, version, persistence flag, four
/// reserved bytes, then a run of `{type, length, body}` events. A body that
/// fails to parse is skipped to its declared length; the rest of the run
/// still decodes.
pub(crate) fn read_shared_object(
    payload: &[u8],
    version: Version,
) -> MessageResult<SharedObjectMessage> {
    let mut cursor = Cursor::new(payload);
    let mut tables = amf3::ReferenceTables::default();

    let name = read_plain_string(&mut cursor, payload, version, &mut tables)?;
    let so_version = cursor.read_u32::<BigEndian>()?;
    let persistent = cursor.read_u32::<BigEndian>()? == 2;
    cursor.read_u32::<BigEndian>()?; // reserved

    let mut events = Vec::new();
    let mut pos = cursor.position() as usize;
    while payload.len() - pos >= 5 {
        let event_type = SharedObjectEventType::from(payload[pos]);
        let length = u32::from_be_bytes(payload[pos + 1..pos + 5].try_into().expect("4 bytes"))
            as usize;
        pos += 5;
        if pos + length > payload.len() {
            tracing::warn!(
                "shared object event body truncated: declared {} bytes, {} left",
                length,
                payload.len() - pos
            );
            break;
        }
        let body = &payload[pos..pos + length];
        pos += length;

        match read_event_body(event_type, body, version, &mut tables) {
            Ok(body) => events.push(SharedObjectEvent { event_type, body }),
            Err(err) => {
                tracing::warn!(
                    "skipping undecodable shared object event {:?}: {}",
                    event_type,
                    err
                );
            }
        }
    }

    Ok(SharedObjectMessage {
        name,
        version: so_version,
        persistent,
        events,
    })
}

fn read_event_body(
    event_type: SharedObjectEventType,
    body: &[u8],
    version: Version,
    tables: &mut amf3::ReferenceTables,
) -> MessageResult<SharedObjectEventBody> {
    let mut cursor = Cursor::new(body);
    match event_type {
        SharedObjectEventType::Status => {
            let code = read_plain_string(&mut cursor, body, version, tables)?;
            let level = read_plain_string(&mut cursor, body, version, tables)?;
            Ok(SharedObjectEventBody::Status { code, level })
        }
        SharedObjectEventType::UpdateData => {
            let mut attributes = Vec::new();
            while (cursor.position() as usize) < body.len() {
                let key = read_plain_string(&mut cursor, body, version, tables)?;
                let value = match read_detected(&mut cursor, body, version, tables)? {
                    Some(value) => value,
                    None => break,
                };
                attributes.push((key, value));
            }
            Ok(SharedObjectEventBody::Attributes(attributes))
        }
        SharedObjectEventType::SendMessage | SharedObjectEventType::ClientSendMessage => {
            let handler = match read_detected(&mut cursor, body, version, tables)? {
                Some(value) => value.try_as_str().map(str::to_string).ok_or_else(|| {
                    MessageError::UnexpectedAmfType(
                        "shared object handler name must be a string".to_string(),
                    )
                })?,
                None => {
                    return Err(MessageError::UnexpectedAmfType(
                        "shared object message without a handler name".to_string(),
                    ));
                }
            };
            let mut arguments = Vec::new();
            while let Some(value) = read_detected(&mut cursor, body, version, tables)? {
                arguments.push(value);
            }
            Ok(SharedObjectEventBody::Message { handler, arguments })
        }
        _ => {
            if body.is_empty() {
                return Ok(SharedObjectEventBody::Empty);
            }
            let key = read_plain_string(&mut cursor, body, version, tables)?;
            let value = read_detected(&mut cursor, body, version, tables)?;
            Ok(SharedObjectEventBody::Keyed {
                key: Some(key),
                value,
            })
        }
    }
}

/// A length-prefixed string without a type marker, in the envelope's
/// negotiated encoding.
fn read_plain_string(
    cursor: &mut Cursor<&[u8]>,
    payload: &[u8],
    version: Version,
    tables: &mut amf3::ReferenceTables,
) -> MessageResult<String> {
    match version {
        Version::Amf0 => {
            let mut reader = amf0::Reader::new(&mut *cursor);
            reader
                .read_raw_string()
                .map_err(|err| MessageError::malformed_amf(payload, cursor.position(), err))
        }
        Version::Amf3 => amf3::read_string(&mut *cursor, tables)
            .map_err(|err| MessageError::malformed_amf(payload, cursor.position(), err)),
    }
}

const AVMPLUS_MARKER: u8 = 0x11;

/// One marked value in the envelope's encoding. In AMF0 envelopes the next
/// byte decides per value: the avmplus marker escalates to AMF3, sharing
/// the envelope-wide reference tables.
fn read_detected(
    cursor: &mut Cursor<&[u8]>,
    payload: &[u8],
    version: Version,
    tables: &mut amf3::ReferenceTables,
) -> MessageResult<Option<amf::Value>> {
    let amf3_value = match version {
        Version::Amf3 => true,
        Version::Amf0 => {
            let data = *cursor.get_ref();
            match data.get(cursor.position() as usize) {
                Some(&AVMPLUS_MARKER) => {
                    cursor.set_position(cursor.position() + 1);
                    true
                }
                Some(_) => false,
                None => return Ok(None),
            }
        }
    };
    if amf3_value {
        match amf3::read_value(&mut *cursor, tables) {
            Ok(value) => Ok(value.map(amf::Value::Amf3)),
            Err(err) => Err(MessageError::malformed_amf(payload, cursor.position(), err)),
        }
    } else {
        let mut reader = amf0::Reader::new(&mut *cursor);
        match reader.read() {
            Ok(value) => Ok(value.map(amf::Value::from_amf0)),
            Err(err) => Err(MessageError::malformed_amf(payload, cursor.position(), err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amf::amf0::Value;
    use byteorder::{BigEndian, WriteBytesExt};

    fn raw_string(out: &mut Vec<u8>, value: &str) {
        Value::write_raw_string(out, value).unwrap();
    }

    fn envelope(name: &str, version: u32, persistent: bool) -> Vec<u8> {
        let mut out = Vec::new();
        raw_string(&mut out, name);
        out.write_u32::<BigEndian>(version).unwrap();
        out.write_u32::<BigEndian>(if persistent { 2 } else { 0 })
            .unwrap();
        out.write_u32::<BigEndian>(0).unwrap();
        out
    }

    fn push_event(out: &mut Vec<u8>, event_type: u8, body: &[u8]) {
        out.push(event_type);
        out.write_u32::<BigEndian>(body.len() as u32).unwrap();
        out.extend_from_slice(body);
    }

    #[test]
    fn envelope_fields_decode() {
        let payload = envelope("chat", 3, true);
        let message = read_shared_object(&payload, Version::Amf0).unwrap();
        assert_eq!(message.name, "chat");
        assert_eq!(message.version, 3);
        assert!(message.persistent);
        assert!(message.events.is_empty());
    }

    #[test]
    fn status_event_carries_code_and_level() {
        let mut payload = envelope("chat", 1, false);
        let mut body = Vec::new();
        raw_string(&mut body, "NetConnection.Connect.Success");
        raw_string(&mut body, "status");
        push_event(&mut payload, 7, &body);

        let message = read_shared_object(&payload, Version::Amf0).unwrap();
        assert_eq!(
            message.events,
            vec![SharedObjectEvent {
                event_type: SharedObjectEventType::Status,
                body: SharedObjectEventBody::Status {
                    code: "NetConnection.Connect.Success".to_string(),
                    level: "status".to_string(),
                },
            }]
        );
    }

    #[test]
    fn update_data_reads_pairs_to_exhaustion() {
        let mut payload = envelope("scores", 1, false);
        let mut body = Vec::new();
        raw_string(&mut body, "alice");
        Value::write_number(&mut body, 12.0).unwrap();
        raw_string(&mut body, "bob");
        Value::write_number(&mut body, 9.0).unwrap();
        push_event(&mut payload, 4, &body);

        let message = read_shared_object(&payload, Version::Amf0).unwrap();
        let SharedObjectEventBody::Attributes(attributes) = &message.events[0].body else {
            panic!("expected attributes");
        };
        assert_eq!(attributes.len(), 2);
        assert_eq!(attributes[0].0, "alice");
        assert_eq!(attributes[1].1.try_as_f64(), Some(9.0));
    }

    #[test]
    fn send_message_reads_handler_and_arguments() {
        let mut payload = envelope("chat", 1, false);
        let mut body = Vec::new();
        Value::write_string(&mut body, "onMessage").unwrap();
        Value::write_string(&mut body, "hello").unwrap();
        Value::write_number(&mut body, 42.0).unwrap();
        push_event(&mut payload, 6, &body);

        let message = read_shared_object(&payload, Version::Amf0).unwrap();
        let SharedObjectEventBody::Message { handler, arguments } = &message.events[0].body
        else {
            panic!("expected a message event");
        };
        assert_eq!(handler, "onMessage");
        assert_eq!(arguments.len(), 2);
        assert_eq!(arguments[0].try_as_str(), Some("hello"));
    }

    #[test]
    fn set_attribute_carries_one_key_and_at_most_one_value() {
        let mut payload = envelope("room", 1, false);
        let mut body = Vec::new();
        raw_string(&mut body, "color");
        Value::write_string(&mut body, "red").unwrap();
        push_event(&mut payload, 3, &body);
        // a key with no value after it is still a complete body
        let mut key_only = Vec::new();
        raw_string(&mut key_only, "dirty");
        push_event(&mut payload, 3, &key_only);

        let message = read_shared_object(&payload, Version::Amf0).unwrap();
        assert_eq!(message.events.len(), 2);
        let SharedObjectEventBody::Keyed { key, value } = &message.events[0].body else {
            panic!("expected a keyed body");
        };
        assert_eq!(key.as_deref(), Some("color"));
        assert_eq!(value.as_ref().and_then(|v| v.try_as_str()), Some("red"));
        assert_eq!(
            message.events[1].body,
            SharedObjectEventBody::Keyed {
                key: Some("dirty".to_string()),
                value: None,
            }
        );
    }

    #[test]
    fn amf3_values_are_detected_per_value() {
        let mut payload = envelope("scores", 1, false);
        let mut body = Vec::new();
        raw_string(&mut body, "best");
        body.extend_from_slice(&[0x11, 0x04, 0x07]); // escalated amf3 integer 7
        push_event(&mut payload, 4, &body);

        let message = read_shared_object(&payload, Version::Amf0).unwrap();
        let SharedObjectEventBody::Attributes(attributes) = &message.events[0].body else {
            panic!("expected attributes");
        };
        assert_eq!(attributes[0].1.try_as_f64(), Some(7.0));
    }

    #[test]
    fn broken_event_is_skipped_and_the_run_continues() {
        let mut payload = envelope("chat", 1, false);
        // a send-message body whose value has a bogus marker
        push_event(&mut payload, 6, &[0xFE, 0x00]);
        let mut body = Vec::new();
        raw_string(&mut body, "cleared");
        push_event(&mut payload, 3, &body);

        let message = read_shared_object(&payload, Version::Amf0).unwrap();
        assert_eq!(message.events.len(), 1);
        assert_eq!(
            message.events[0].event_type,
            SharedObjectEventType::SetAttribute
        );
    }

    #[test]
    fn empty_event_body() {
        let mut payload = envelope("chat", 1, false);
        push_event(&mut payload, 8, &[]);
        let message = read_shared_object(&payload, Version::Amf0).unwrap();
        assert_eq!(message.events[0].body, SharedObjectEventBody::Empty);
    }
}
