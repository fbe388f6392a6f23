//! Chat
//!
//! Conversation and message data model, the persistent chat store, and
//! the REST façade over it. The realtime gateway shares the same store;
//! every mutation goes through it regardless of transport.

/// Conversation and message types
pub mod model;

/// Persistent chat store (source of truth)
pub mod store;

/// REST façade handlers
pub mod handlers;

pub use model::{Conversation, ConversationSummary, Message, MessagePage};
pub use store::{ChatStore, ChatStoreError, MAX_CONTENT_CHARS};
