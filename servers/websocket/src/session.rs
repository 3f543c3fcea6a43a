use tokio::sync::mpsc;
use tungstenite::protocol::frame::{CloseFrame, coding::CloseCode};
use uuid::Uuid;

/// Control commands delivered to the task driving a session's socket.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    Close(CloseFrame),
}

/// A registered WebSocket session handle. Cheap to clone; the socket itself
/// lives with the connection task, reachable only through the command
/// channel so no registry lock is ever held across network work.
#[derive(Debug, Clone)]
pub struct Session {
    id: Uuid,
    path: String,
    user_principal: Option<String>,
    http_session_id: Option<String>,
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl Session {
    pub fn new(
        path: String,
        user_principal: Option<String>,
        http_session_id: Option<String>,
    ) -> (Self, mpsc::UnboundedReceiver<SessionCommand>) {
        let (commands, receiver) = mpsc::unbounded_channel();
        (
            Self {
                id: Uuid::now_v7(),
                path,
                user_principal,
                http_session_id,
                commands,
            },
            receiver,
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn user_principal(&self) -> Option<&str> {
        self.user_principal.as_deref()
    }

    pub fn http_session_id(&self) -> Option<&str> {
        self.http_session_id.as_deref()
    }

    /// Both an authenticated user and a backing HTTP session are needed for
    /// the session to be indexed by HTTP session id.
    pub fn is_authenticated(&self) -> bool {
        self.user_principal.is_some() && self.http_session_id.is_some()
    }

    /// Ask the connection task to close the socket. A task that is already
    /// gone makes this a no-op.
    pub fn close(&self, code: CloseCode, reason: &str) {
        let frame = CloseFrame {
            code,
            reason: reason.to_string().into(),
        };
        if self.commands.send(SessionCommand::Close(frame)).is_err() {
            tracing::trace!("session {} already dropped its command channel", self.id);
        }
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Session {}
