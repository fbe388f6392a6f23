//! Realtime layer
//!
//! The hot path: typed event protocol, presence tracking, room
//! membership, and the WebSocket gateway that connects them to the chat
//! store.

/// Client/server event protocol
pub mod event;

/// User presence registry
pub mod presence;

/// Conversation-room membership
pub mod rooms;

/// WebSocket connection handling and fan-out
pub mod gateway;

pub use event::{ClientEvent, ServerEvent};
pub use gateway::{websocket_handler, Gateway, AUTH_TIMEOUT};
pub use presence::{ConnectionId, PresenceTracker};
pub use rooms::RoomRegistry;
