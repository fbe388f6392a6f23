//! Chat data structures
//!
//! Wire and storage types for conversations and messages. Conversations
//! are strictly two-party; the participant pair is stored in canonical
//! order so that lookup by pair is order-insensitive.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::users::UserPublic;

/// A stored conversation row.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    pub id: Uuid,
    /// Smaller participant id (canonical pair order)
    pub user_lo: Uuid,
    /// Larger participant id
    pub user_hi: Uuid,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Canonicalize an unordered participant pair.
    pub fn canonical_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub fn participants(&self) -> [Uuid; 2] {
        [self.user_lo, self.user_hi]
    }

    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.user_lo == user_id || self.user_hi == user_id
    }

    /// The participant that is not `user_id`.
    pub fn other_participant(&self, user_id: Uuid) -> Uuid {
        if self.user_lo == user_id {
            self.user_hi
        } else {
            self.user_lo
        }
    }
}

/// A message as stored and as delivered over the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub conversation_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Participants who have seen the message. Only ever grows.
    #[serde(default)]
    pub read_by: Vec<Uuid>,
}

/// One entry of the conversation list: the other participant's profile,
/// the latest message, and how many messages the caller has not read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: Uuid,
    pub participant: UserPublic,
    pub last_message: Option<Message>,
    pub unread_count: i64,
}

/// One page of chat history, oldest-to-newest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub has_more: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_pair_is_order_insensitive() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(
            Conversation::canonical_pair(a, b),
            Conversation::canonical_pair(b, a)
        );
    }

    #[test]
    fn other_participant_flips() {
        let (lo, hi) = Conversation::canonical_pair(Uuid::new_v4(), Uuid::new_v4());
        let conversation = Conversation {
            id: Uuid::new_v4(),
            user_lo: lo,
            user_hi: hi,
            last_message_at: None,
            created_at: Utc::now(),
        };

        assert_eq!(conversation.other_participant(lo), hi);
        assert_eq!(conversation.other_participant(hi), lo);
        assert!(conversation.has_participant(lo));
        assert!(!conversation.has_participant(Uuid::new_v4()));
    }

    #[test]
    fn message_serializes_camel_case() {
        let message = Message {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            content: "hi".to_string(),
            created_at: Utc::now(),
            read_by: vec![],
        };

        let value = serde_json::to_value(&message).unwrap();
        assert!(value.get("conversationId").is_some());
        assert!(value.get("senderId").is_some());
        assert!(value.get("createdAt").is_some());
        assert!(value.get("readBy").is_some());
    }
}
