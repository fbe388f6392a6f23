//! Chat store
//!
//! The single source of truth for conversations, messages, and read
//! receipts. Both transports (REST façade and realtime gateway) funnel
//! every mutation through the operations here; fan-out only happens after
//! an operation has durably completed.
//!
//! Per-conversation message order is insertion order. SQLite serializes
//! writes, and the unique index on the canonical participant pair makes
//! concurrent get-or-create idempotent.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

use crate::auth::users;
use crate::chat::model::{Conversation, ConversationSummary, Message, MessagePage};

/// Longest accepted message content, in characters.
pub const MAX_CONTENT_CHARS: usize = 2000;

/// Failures of chat store operations.
#[derive(Debug, Error)]
pub enum ChatStoreError {
    #[error("cannot start a conversation with yourself")]
    SelfConversation,

    #[error("sender is not a participant in the conversation")]
    NotParticipant,

    #[error("message content is empty")]
    EmptyContent,

    #[error("message content exceeds {0} characters")]
    ContentTooLong(usize),

    #[error("conversation not found")]
    ConversationNotFound,

    #[error("user not found")]
    UserNotFound,

    #[error("database error")]
    Database(#[from] sqlx::Error),
}

/// Persistent record of conversations and their message logs.
#[derive(Clone)]
pub struct ChatStore {
    pool: SqlitePool,
}

impl ChatStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Return the conversation for the unordered pair, creating it if
    /// absent. Safe under concurrent calls: the unique pair index makes
    /// the insert a no-op for the loser of the race.
    pub async fn get_or_create_conversation(
        &self,
        user_id: Uuid,
        other_id: Uuid,
    ) -> Result<Conversation, ChatStoreError> {
        if user_id == other_id {
            return Err(ChatStoreError::SelfConversation);
        }
        if users::get_user_by_id(&self.pool, other_id).await?.is_none() {
            return Err(ChatStoreError::UserNotFound);
        }

        let (lo, hi) = Conversation::canonical_pair(user_id, other_id);

        sqlx::query(
            r#"
            INSERT INTO conversations (id, user_lo, user_hi, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_lo, user_hi) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(lo)
        .bind(hi)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(
            "SELECT id, user_lo, user_hi, last_message_at, created_at
             FROM conversations WHERE user_lo = $1 AND user_hi = $2",
        )
        .bind(lo)
        .bind(hi)
        .fetch_one(&self.pool)
        .await?;

        Ok(row_to_conversation(&row))
    }

    /// Fetch a conversation by id.
    pub async fn conversation(&self, id: Uuid) -> Result<Conversation, ChatStoreError> {
        let row = sqlx::query(
            "SELECT id, user_lo, user_hi, last_message_at, created_at
             FROM conversations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(ChatStoreError::ConversationNotFound)?;

        Ok(row_to_conversation(&row))
    }

    /// Ids of every conversation the user participates in. Used for the
    /// bulk room join at connect time.
    pub async fn conversation_ids_for(&self, user_id: Uuid) -> Result<Vec<Uuid>, ChatStoreError> {
        let rows = sqlx::query(
            "SELECT id FROM conversations WHERE user_lo = $1 OR user_hi = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|r| r.get("id")).collect())
    }

    /// Conversation summaries for the chat list, most recent first.
    pub async fn list_conversations(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ConversationSummary>, ChatStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_lo, user_hi, last_message_at, created_at
            FROM conversations
            WHERE user_lo = $1 OR user_hi = $1
            ORDER BY COALESCE(last_message_at, created_at) DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in rows {
            let conversation = row_to_conversation(&row);
            let other_id = conversation.other_participant(user_id);

            let other = users::get_user_by_id(&self.pool, other_id)
                .await?
                .ok_or(ChatStoreError::UserNotFound)?;

            let last_message = self.last_message(conversation.id).await?;
            let unread_count = self.unread_count(conversation.id, user_id).await?;

            summaries.push(ConversationSummary {
                id: conversation.id,
                participant: other.public(),
                last_message,
                unread_count,
            });
        }

        Ok(summaries)
    }

    /// Append a message. Validates the sender and content, stores the
    /// message and bumps the conversation's last-message timestamp in one
    /// transaction, and returns the stored message.
    pub async fn append_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
    ) -> Result<Message, ChatStoreError> {
        let conversation = self.conversation(conversation_id).await?;
        if !conversation.has_participant(sender_id) {
            return Err(ChatStoreError::NotParticipant);
        }

        let content = content.trim();
        if content.is_empty() {
            return Err(ChatStoreError::EmptyContent);
        }
        if content.chars().count() > MAX_CONTENT_CHARS {
            return Err(ChatStoreError::ContentTooLong(MAX_CONTENT_CHARS));
        }

        let message = Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id,
            content: content.to_string(),
            created_at: Utc::now(),
            read_by: Vec::new(),
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO messages (id, conversation_id, sender_id, content, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.sender_id)
        .bind(&message.content)
        .bind(message.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE conversations SET last_message_at = $1 WHERE id = $2")
            .bind(message.created_at)
            .bind(conversation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(message)
    }

    /// One page of chat history. Page 1 holds the newest `page_size`
    /// messages; within a page messages run oldest-to-newest. As a side
    /// effect, returned messages not authored by the requester are marked
    /// read by them (idempotent).
    pub async fn list_messages(
        &self,
        conversation_id: Uuid,
        requester_id: Uuid,
        page: u32,
        page_size: u32,
    ) -> Result<MessagePage, ChatStoreError> {
        let conversation = self.conversation(conversation_id).await?;
        if !conversation.has_participant(requester_id) {
            return Err(ChatStoreError::NotParticipant);
        }

        let limit = i64::from(page_size.max(1));
        let offset = i64::from(page.max(1) - 1) * limit;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE conversation_id = $1")
                .bind(conversation_id)
                .fetch_one(&self.pool)
                .await?;

        // Reading history counts as seeing it: mark the page's incoming
        // messages read before loading the reader sets.
        sqlx::query(
            r#"
            INSERT INTO message_reads (message_id, user_id, read_at)
            SELECT id, $1, $2 FROM messages
            WHERE conversation_id = $3 AND sender_id != $1
              AND id IN (SELECT id FROM messages WHERE conversation_id = $3
                         ORDER BY rowid DESC LIMIT $4 OFFSET $5)
            ON CONFLICT (message_id, user_id) DO NOTHING
            "#,
        )
        .bind(requester_id)
        .bind(Utc::now())
        .bind(conversation_id)
        .bind(limit)
        .bind(offset)
        .execute(&self.pool)
        .await?;

        let rows = sqlx::query(
            r#"
            SELECT id, conversation_id, sender_id, content, created_at
            FROM messages WHERE conversation_id = $1
            ORDER BY rowid DESC LIMIT $2 OFFSET $3
            "#,
        )
        .bind(conversation_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let mut readers = self
            .readers_for_page(conversation_id, limit, offset)
            .await?;

        let mut messages: Vec<Message> = rows
            .iter()
            .map(|row| {
                let id: Uuid = row.get("id");
                Message {
                    id,
                    conversation_id: row.get("conversation_id"),
                    sender_id: row.get("sender_id"),
                    content: row.get("content"),
                    created_at: row.get("created_at"),
                    read_by: readers.remove(&id).unwrap_or_default(),
                }
            })
            .collect();
        messages.reverse();

        Ok(MessagePage {
            messages,
            has_more: offset + limit < total,
        })
    }

    /// Mark every unread message addressed to `reader_id` as read.
    /// Returns how many messages were newly marked.
    pub async fn mark_conversation_read(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
    ) -> Result<u64, ChatStoreError> {
        let conversation = self.conversation(conversation_id).await?;
        if !conversation.has_participant(reader_id) {
            return Err(ChatStoreError::NotParticipant);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO message_reads (message_id, user_id, read_at)
            SELECT id, $1, $2 FROM messages
            WHERE conversation_id = $3 AND sender_id != $1
            ON CONFLICT (message_id, user_id) DO NOTHING
            "#,
        )
        .bind(reader_id)
        .bind(Utc::now())
        .bind(conversation_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Count of messages in the conversation the user has not read,
    /// excluding their own.
    pub async fn unread_count(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> Result<i64, ChatStoreError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM messages m
            WHERE m.conversation_id = $1 AND m.sender_id != $2
              AND NOT EXISTS (SELECT 1 FROM message_reads r
                              WHERE r.message_id = m.id AND r.user_id = $2)
            "#,
        )
        .bind(conversation_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Latest message of a conversation, with its reader set.
    async fn last_message(
        &self,
        conversation_id: Uuid,
    ) -> Result<Option<Message>, ChatStoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, conversation_id, sender_id, content, created_at
            FROM messages WHERE conversation_id = $1
            ORDER BY rowid DESC LIMIT 1
            "#,
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: Uuid = row.get("id");
        let reader_rows =
            sqlx::query("SELECT user_id FROM message_reads WHERE message_id = $1")
                .bind(id)
                .fetch_all(&self.pool)
                .await?;

        Ok(Some(Message {
            id,
            conversation_id: row.get("conversation_id"),
            sender_id: row.get("sender_id"),
            content: row.get("content"),
            created_at: row.get("created_at"),
            read_by: reader_rows.iter().map(|r| r.get("user_id")).collect(),
        }))
    }

    /// Reader sets for the messages of one history page.
    async fn readers_for_page(
        &self,
        conversation_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<HashMap<Uuid, Vec<Uuid>>, ChatStoreError> {
        let rows = sqlx::query(
            r#"
            SELECT message_id, user_id FROM message_reads
            WHERE message_id IN (SELECT id FROM messages WHERE conversation_id = $1
                                 ORDER BY rowid DESC LIMIT $2 OFFSET $3)
            "#,
        )
        .bind(conversation_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let mut readers: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for row in rows {
            readers
                .entry(row.get("message_id"))
                .or_default()
                .push(row.get("user_id"));
        }

        Ok(readers)
    }
}

fn row_to_conversation(row: &sqlx::sqlite::SqliteRow) -> Conversation {
    Conversation {
        id: row.get("id"),
        user_lo: row.get("user_lo"),
        user_hi: row.get("user_hi"),
        last_message_at: row.get("last_message_at"),
        created_at: row.get("created_at"),
    }
}
