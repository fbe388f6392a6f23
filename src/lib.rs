//! Ripple — real-time chat server
//!
//! The chat subsystem of a social-networking product: a persistent chat
//! store over SQLite, a WebSocket gateway for live delivery with presence
//! and typing indicators, and a REST façade for the cold path.
//!
//! # Module Structure
//!
//! - **`auth`** - user directory, JWT sessions, signup/login handlers
//! - **`chat`** - conversation/message model, chat store, REST façade
//! - **`realtime`** - event protocol, presence, rooms, WebSocket gateway
//! - **`middleware`** - bearer-token authentication
//! - **`config`** / **`db`** / **`error`** - configuration, pool and
//!   migrations, API error taxonomy
//! - **`routes`** / **`state`** - router assembly and the composition root
//!
//! Both transports converge on [`chat::ChatStore`] as the single source
//! of truth; the gateway broadcasts only after a store mutation has
//! durably completed.

/// Authentication and user directory
pub mod auth;

/// Chat store, data model, and REST façade
pub mod chat;

/// Server configuration
pub mod config;

/// Database pool and migrations
pub mod db;

/// API error taxonomy
pub mod error;

/// Request middleware
pub mod middleware;

/// Realtime gateway, presence, rooms, events
pub mod realtime;

/// Router assembly
pub mod routes;

/// Application state (composition root)
pub mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use routes::create_app;
pub use state::AppState;
