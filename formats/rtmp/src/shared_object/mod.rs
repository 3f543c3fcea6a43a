pub mod reader;

/// Wire values for shared-object event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharedObjectEventType {
    ServerConnect,
    ServerDisconnect,
    SetAttribute,
    UpdateData,
    UpdateAttribute,
    SendMessage,
    Status,
    ClearData,
    DeleteData,
    RemoveAttribute,
    ClientSendMessage,
    Unknown(u8),
}

impl From<u8> for SharedObjectEventType {
    fn from(value: u8) -> Self {
        match value {
            1 => SharedObjectEventType::ServerConnect,
            2 => SharedObjectEventType::ServerDisconnect,
            3 => SharedObjectEventType::SetAttribute,
            4 => SharedObjectEventType::UpdateData,
            5 => SharedObjectEventType::UpdateAttribute,
            6 => SharedObjectEventType::SendMessage,
            7 => SharedObjectEventType::Status,
            8 => SharedObjectEventType::ClearData,
            9 => SharedObjectEventType::DeleteData,
            10 => SharedObjectEventType::RemoveAttribute,
            11 => SharedObjectEventType::ClientSendMessage,
            value => SharedObjectEventType::Unknown(value),
        }
    }
}

/// One update inside a shared-object message.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedObjectEvent {
    pub event_type: SharedObjectEventType,
    pub body: SharedObjectEventBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SharedObjectEventBody {
    /// Two plain strings: a status code and its level.
    Status { code: String, level: String },
    /// Key-value pairs filling the event body.
    Attributes(Vec<(String, amf::Value)>),
    /// A handler name plus positional values.
    Message {
        handler: String,
        arguments: Vec<amf::Value>,
    },
    /// A key and at most one value; the shape of every other non-empty
    /// event body.
    Keyed {
        key: Option<String>,
        value: Option<amf::Value>,
    },
    Empty,
}

/// A reassembled shared-object message: the envelope plus its event run.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedObjectMessage {
    pub name: String,
    pub version: u32,
    pub persistent: bool,
    pub events: Vec<SharedObjectEvent>,
}
