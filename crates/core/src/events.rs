//! Wire-protocol events exchanged over the WebSocket transport.
//!
//! Frames are JSON envelopes `{"event": "<name>", "data": {...}}` in both
//! directions. Event names are snake_case, payload fields camelCase to match
//! the portal clients.

use crate::message::ChatMessage;
use serde::{Deserialize, Serialize};

/// Events received from clients (visitors and operators).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ClientEvent {
    /// Visitor joins, carrying a possibly stale or absent prior session id.
    JoinChat {
        #[serde(default)]
        session_id: Option<String>,
        customer_name: String,
        #[serde(default)]
        customer_email: Option<String>,
    },
    /// Message send-path.
    SendMessage {
        session_id: String,
        text: String,
        is_user: bool,
        #[serde(default)]
        admin_id: Option<String>,
    },
    /// Operator joins the admin broadcast group.
    JoinAdmin { admin_id: String },
    /// Operator joins a specific session's room.
    AdminJoinSession {
        session_id: String,
        admin_id: String,
    },
    /// Ephemeral typing indicator.
    Typing {
        session_id: String,
        is_typing: bool,
        is_admin: bool,
    },
    /// Bulk sent -> read transition for a session.
    MarkRead { session_id: String },
    /// Explicit session closure.
    CloseChat { session_id: String },
}

/// Events delivered to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerEvent {
    /// Resolved session id, echoed so the client can persist it.
    SessionCreated { session_id: String },
    /// A message delivered to a session room (sender included).
    NewMessage(ChatMessage),
    /// Admin-group notification of a new or resumed session.
    ChatUpdate {
        session_id: String,
        customer_name: String,
    },
    /// Admin-group summary of a visitor message.
    CustomerMessage {
        session_id: String,
        customer_name: String,
        text: String,
    },
    /// Notifies the visitor room that an operator joined.
    AdminJoined { admin_id: String, message: String },
    /// Typing signal fanned out to other room members.
    TypingIndicator { is_typing: bool, is_admin: bool },
    /// The session's messages were marked read.
    MessagesRead { session_id: String },
    /// The session was closed.
    ChatClosed { session_id: String },
    /// Failure surfaced to the triggering connection only.
    Error { message: String },
}

impl ServerEvent {
    /// The wire name of this event, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SessionCreated { .. } => "session_created",
            Self::NewMessage(_) => "new_message",
            Self::ChatUpdate { .. } => "chat_update",
            Self::CustomerMessage { .. } => "customer_message",
            Self::AdminJoined { .. } => "admin_joined",
            Self::TypingIndicator { .. } => "typing_indicator",
            Self::MessagesRead { .. } => "messages_read",
            Self::ChatClosed { .. } => "chat_closed",
            Self::Error { .. } => "error",
        }
    }
}
