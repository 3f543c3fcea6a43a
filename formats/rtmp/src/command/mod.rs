use std::collections::HashMap;

use tokio_util::bytes::BytesMut;

pub mod reader;

/// A decoded invoke/notify action: a remote call with a method name, an
/// optional dotted service prefix, a transaction id and positional
/// arguments. A leading map argument is the connection parameter object.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionCall {
    pub service_name: Option<String>,
    pub method: String,
    pub transaction_id: f64,
    pub connection_params: Option<HashMap<String, amf::Value>>,
    pub arguments: Vec<amf::Value>,
}

/// Metadata-style payload on a live stream (NOTIFY with a non-zero stream
/// id, or FLEX_STREAM_SEND).
#[derive(Debug, Clone, PartialEq)]
pub enum StreamDataEvent {
    /// An `@setDataFrame` wrapper: the inner method (`onMetaData`,
    /// `onCuePoint`, ...) and its parameter value, re-serialized as plain
    /// AMF0 into `payload`.
    SetDataFrame {
        method: String,
        parameters: amf::Value,
        payload: BytesMut,
    },
    /// Anything else is carried verbatim with the detected action attached.
    Raw { action: String, payload: BytesMut },
}

/// Split a dotted action name at its final `.` into service and method,
/// shedding the `@`/`|` routing prefixes either part may carry.
pub(crate) fn split_action_name(action: &str) -> (Option<String>, String) {
    let strip = |part: &str| part.trim_start_matches(['@', '|']).to_string();
    match action.rfind('.') {
        Some(index) => (
            Some(strip(&action[..index])),
            strip(&action[index + 1..]),
        ),
        None => (None, strip(action)),
    }
}

#[cfg(test)]
mod tests {
    use super::split_action_name;

    #[test]
    fn bare_method() {
        assert_eq!(split_action_name("connect"), (None, "connect".to_string()));
    }

    #[test]
    fn dotted_action_splits_at_the_last_dot() {
        assert_eq!(
            split_action_name("scheduler.v1.fire"),
            (Some("scheduler.v1".to_string()), "fire".to_string())
        );
    }

    #[test]
    fn routing_prefixes_are_shed() {
        assert_eq!(
            split_action_name("|RPC.@invoke"),
            (Some("RPC".to_string()), "invoke".to_string())
        );
        assert_eq!(
            split_action_name("@setDataFrame"),
            (None, "setDataFrame".to_string())
        );
    }
}
