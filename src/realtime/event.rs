//! Realtime event protocol
//!
//! Typed bidirectional events carried as JSON text frames over the
//! WebSocket, tagged `{"event": <kebab-case name>, "data": {..}}`.
//!
//! Client events drive the gateway; server events are what the gateway
//! fans out. Typing signals are transient and best-effort: they are never
//! persisted, and receivers should clear an indicator that is not
//! refreshed within a few seconds.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::users::UserPublic;
use crate::chat::model::Message;

/// Events a client may send.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Handshake credential; must be the first frame on the connection.
    #[serde(rename_all = "camelCase")]
    Authenticate { token: String },

    #[serde(rename_all = "camelCase")]
    JoinConversation { conversation_id: Uuid },

    #[serde(rename_all = "camelCase")]
    LeaveConversation { conversation_id: Uuid },

    #[serde(rename_all = "camelCase")]
    SendMessage {
        conversation_id: Uuid,
        content: String,
    },

    #[serde(rename_all = "camelCase")]
    TypingStart { conversation_id: Uuid },

    #[serde(rename_all = "camelCase")]
    TypingStop { conversation_id: Uuid },

    #[serde(rename_all = "camelCase")]
    MarkRead { conversation_id: Uuid },
}

/// Events the server may deliver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Handshake ack carrying the caller's own profile.
    #[serde(rename_all = "camelCase")]
    Authenticated { user: UserPublic },

    #[serde(rename_all = "camelCase")]
    NewMessage {
        conversation_id: Uuid,
        message: Message,
    },

    /// A conversation the receiver participates in has new activity they
    /// are not currently watching.
    #[serde(rename_all = "camelCase")]
    ConversationUpdated {
        conversation_id: Uuid,
        last_message: Message,
    },

    #[serde(rename_all = "camelCase")]
    UserTyping {
        conversation_id: Uuid,
        user_id: Uuid,
        username: String,
    },

    #[serde(rename_all = "camelCase")]
    UserStoppedTyping {
        conversation_id: Uuid,
        user_id: Uuid,
    },

    #[serde(rename_all = "camelCase")]
    MessagesRead {
        conversation_id: Uuid,
        user_id: Uuid,
    },

    #[serde(rename_all = "camelCase")]
    UserOnline { user_id: Uuid },

    #[serde(rename_all = "camelCase")]
    UserOffline { user_id: Uuid },

    #[serde(rename_all = "camelCase")]
    Error { message: String },
}
