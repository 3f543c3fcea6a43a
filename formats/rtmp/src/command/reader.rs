use std::io::Cursor;

use amf::amf0;
use tokio_util::bytes::BytesMut;

use crate::message::errors::{MessageError, MessageResult};

use super::{ActionCall, StreamDataEvent, split_action_name};

const SET_DATA_FRAME: &str = "@setDataFrame";

fn next_value(
    reader: &mut amf0::Reader<&mut Cursor<&[u8]>>,
    payload: &[u8],
) -> MessageResult<Option<amf::Value>> {
    match reader.read() {
        Ok(Some(value)) => Ok(Some(amf::Value::from_amf0(value))),
        Ok(None) => Ok(None),
        Err(err) => Err(MessageError::malformed_amf(
            payload,
            reader.inner_mut().position(),
            err,
        )),
    }
}

fn expect_string(value: Option<amf::Value>, what: &str) -> MessageResult<String> {
    match value {
        Some(value) => value
            .try_as_str()
            .map(str::to_string)
            .ok_or_else(|| MessageError::UnexpectedAmfType(format!("{} must be a string", what))),
        None => Err(MessageError::UnexpectedAmfType(format!(
            "{} is missing",
            what
        ))),
    }
}

/// Decode an invoke/notify body: action string, transaction id, optional
/// connection parameter map, positional arguments. Flex message bodies skip
/// a leading envelope byte and may switch to AMF3 per value; the AMF0
/// reader's escalation handles the switch.
pub(crate) fn read_action_call(payload: &[u8], skip_lead_byte: bool) -> MessageResult<ActionCall> {
    let mut cursor = Cursor::new(payload);
    if skip_lead_byte {
        cursor.set_position(1);
    }
    let mut amf_reader = amf0::Reader::new(&mut cursor);

    let action = match next_value(&mut amf_reader, payload)? {
        Some(value) => value
            .try_as_str()
            .map(str::to_string)
            .ok_or(MessageError::MissingActionName)?,
        None => return Err(MessageError::MissingActionName),
    };

    // once the action string is in hand, a decode failure further into the
    // body degrades the call instead of killing the message
    let transaction_id;
    let mut pending = None;
    let mut truncated = false;
    match next_value(&mut amf_reader, payload) {
        Ok(None) => transaction_id = 0.0,
        Ok(Some(value)) => match value.try_as_f64() {
            Some(number) => transaction_id = number,
            None => {
                transaction_id = 0.0;
                pending = Some(value);
            }
        },
        Err(err) => {
            tracing::warn!("dropping undecodable arguments of action {}: {}", action, err);
            transaction_id = 0.0;
            truncated = true;
        }
    }

    let mut connection_params = None;
    let mut arguments = Vec::new();
    let mut first = true;
    while !truncated {
        let value = match pending.take() {
            Some(value) => Some(value),
            None => match next_value(&mut amf_reader, payload) {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(
                        "dropping undecodable arguments of action {}: {}",
                        action,
                        err
                    );
                    break;
                }
            },
        };
        let Some(value) = value else { break };
        if first && value.is_map_like() {
            match value.try_into_map() {
                Ok(map) => connection_params = Some(map),
                Err(value) => arguments.push(value),
            }
        } else {
            arguments.push(value);
        }
        first = false;
    }

    let (service_name, method) = split_action_name(&action);
    Ok(ActionCall {
        service_name,
        method,
        transaction_id,
        connection_params,
        arguments,
    })
}

/// Decode a stream-data body. `@setDataFrame` wrappers are unwrapped and
/// their (method, parameters) pair re-serialized as plain AMF0; everything
/// else is retained verbatim with the detected action attached.
pub(crate) fn read_stream_data(
    payload: &[u8],
    skip_lead_byte: bool,
) -> MessageResult<StreamDataEvent> {
    let data_offset = usize::from(skip_lead_byte).min(payload.len());
    let data = &payload[data_offset..];
    let mut cursor = Cursor::new(data);
    let mut amf_reader = amf0::Reader::new(&mut cursor);

    let action = match next_value(&mut amf_reader, data)? {
        Some(value) => value
            .try_as_str()
            .map(str::to_string)
            .ok_or(MessageError::MissingActionName)?,
        None => return Err(MessageError::MissingActionName),
    };

    if action == SET_DATA_FRAME {
        let method = expect_string(
            next_value(&mut amf_reader, data)?,
            "metadata method name",
        )?;
        let parameters = match next_value(&mut amf_reader, data)? {
            Some(value) => value,
            None => amf::Value::Amf0(amf0::Value::Null),
        };

        let mut encoded = Vec::new();
        amf0::Value::write_string(&mut encoded, &method)?;
        parameters.to_amf0()?.write_to(&mut encoded)?;

        Ok(StreamDataEvent::SetDataFrame {
            method,
            parameters,
            payload: BytesMut::from(&encoded[..]),
        })
    } else {
        Ok(StreamDataEvent::Raw {
            action,
            payload: BytesMut::from(data),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use amf::amf0::Value;

    fn amf0_string(out: &mut Vec<u8>, value: &str) {
        Value::write_string(out, value).unwrap();
    }

    fn amf0_number(out: &mut Vec<u8>, value: f64) {
        Value::write_number(out, value).unwrap();
    }

    #[test]
    fn connect_invoke() {
        let mut payload = Vec::new();
        amf0_string(&mut payload, "connect");
        amf0_number(&mut payload, 1.0);
        Value::write_object(
            &mut payload,
            None,
            &[("app".to_string(), Value::String("live".to_string()))],
        )
        .unwrap();

        let call = read_action_call(&payload, false).unwrap();
        assert_eq!(call.service_name, None);
        assert_eq!(call.method, "connect");
        assert_eq!(call.transaction_id, 1.0);
        assert!(call.arguments.is_empty());
        let params = call.connection_params.unwrap();
        assert_eq!(params["app"].try_as_str(), Some("live"));
    }

    #[test]
    fn dotted_service_call_with_positional_args() {
        let mut payload = Vec::new();
        amf0_string(&mut payload, "math.v2.add");
        amf0_number(&mut payload, 7.0);
        Value::write_null(&mut payload).unwrap();
        amf0_number(&mut payload, 2.0);
        amf0_number(&mut payload, 3.0);

        let call = read_action_call(&payload, false).unwrap();
        assert_eq!(call.service_name.as_deref(), Some("math.v2"));
        assert_eq!(call.method, "add");
        assert_eq!(call.transaction_id, 7.0);
        assert!(call.connection_params.is_none());
        // the leading null is not a map, so it lands in the argument list
        assert_eq!(call.arguments.len(), 3);
    }

    #[test]
    fn missing_transaction_id_defaults_to_zero() {
        let mut payload = Vec::new();
        amf0_string(&mut payload, "onStatus");
        let call = read_action_call(&payload, false).unwrap();
        assert_eq!(call.transaction_id, 0.0);
        assert!(call.arguments.is_empty());
    }

    #[test]
    fn flex_body_skips_the_envelope_byte_and_mixes_encodings() {
        let mut payload = vec![0x00];
        amf0_string(&mut payload, "receive");
        amf0_number(&mut payload, 2.0);
        Value::write_null(&mut payload).unwrap();
        // an AMF3 string argument behind the escalation marker
        payload.extend_from_slice(&[0x11, 0x06, 0x07]);
        payload.extend_from_slice(b"abc");

        let call = read_action_call(&payload, true).unwrap();
        assert_eq!(call.method, "receive");
        assert_eq!(call.transaction_id, 2.0);
        assert_eq!(call.arguments.len(), 2);
        assert_eq!(call.arguments[1].try_as_str(), Some("abc"));
    }

    #[test]
    fn broken_arguments_degrade_the_call_instead_of_failing_it() {
        let mut payload = Vec::new();
        amf0_string(&mut payload, "publish");
        amf0_number(&mut payload, 5.0);
        Value::write_null(&mut payload).unwrap();
        amf0_string(&mut payload, "live-stream");
        payload.extend_from_slice(&[0xFE]); // bogus marker

        let call = read_action_call(&payload, false).unwrap();
        assert_eq!(call.method, "publish");
        assert_eq!(call.transaction_id, 5.0);
        assert_eq!(call.arguments.len(), 2);
        assert_eq!(call.arguments[1].try_as_str(), Some("live-stream"));
    }

    #[test]
    fn empty_body_has_no_action() {
        assert!(matches!(
            read_action_call(&[], false),
            Err(MessageError::MissingActionName)
        ));
    }

    #[test]
    fn set_data_frame_re_encodes_as_amf0() {
        let mut payload = Vec::new();
        amf0_string(&mut payload, "@setDataFrame");
        amf0_string(&mut payload, "onMetaData");
        Value::write_ecma_array(
            &mut payload,
            &[("duration".to_string(), Value::Number(0.0))],
        )
        .unwrap();

        let event = read_stream_data(&payload, false).unwrap();
        let StreamDataEvent::SetDataFrame {
            method,
            parameters,
            payload: encoded,
        } = event
        else {
            panic!("expected a set-data-frame event");
        };
        assert_eq!(method, "onMetaData");
        assert!(parameters.is_map_like());

        // the re-encoded buffer reads back to the same (method, params) pair
        let mut encoded_slice = &encoded[..];
        let mut reader = amf::amf0::Reader::new(&mut encoded_slice);
        assert_eq!(
            reader.read().unwrap(),
            Some(Value::String("onMetaData".to_string()))
        );
        assert_eq!(
            reader.read().unwrap(),
            Some(Value::EcmaArray(vec![(
                "duration".to_string(),
                Value::Number(0.0)
            )]))
        );
    }

    #[test]
    fn other_actions_keep_the_raw_payload() {
        let mut payload = Vec::new();
        amf0_string(&mut payload, "onCuePoint");
        amf0_number(&mut payload, 12.5);

        let event = read_stream_data(&payload, false).unwrap();
        let StreamDataEvent::Raw {
            action,
            payload: raw,
        } = event
        else {
            panic!("expected a raw event");
        };
        assert_eq!(action, "onCuePoint");
        assert_eq!(&raw[..], &payload[..]);
    }
}
