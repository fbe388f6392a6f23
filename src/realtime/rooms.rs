//! Room membership
//!
//! Ephemeral fan-out scoping: which connections are watching which
//! conversation. Kept as a typed association in both directions so
//! broadcast targets are enumerable, instead of ad hoc string room keys.
//! Joining or leaving a room never touches persisted state.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use uuid::Uuid;

use crate::realtime::presence::ConnectionId;

#[derive(Debug, Default)]
struct RoomMaps {
    /// conversation id -> member connections
    members: HashMap<Uuid, HashSet<ConnectionId>>,
    /// connection -> joined conversation ids
    joined: HashMap<ConnectionId, HashSet<Uuid>>,
}

/// Conversation-room membership registry.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    inner: Mutex<RoomMaps>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join a connection to a conversation room. Idempotent.
    pub fn join(&self, conversation_id: Uuid, conn: ConnectionId) {
        let mut inner = self.inner.lock().expect("room lock poisoned");
        inner.members.entry(conversation_id).or_default().insert(conn);
        inner.joined.entry(conn).or_default().insert(conversation_id);
    }

    /// Remove a connection from a conversation room.
    pub fn leave(&self, conversation_id: Uuid, conn: ConnectionId) {
        let mut inner = self.inner.lock().expect("room lock poisoned");
        if let Some(members) = inner.members.get_mut(&conversation_id) {
            members.remove(&conn);
            if members.is_empty() {
                inner.members.remove(&conversation_id);
            }
        }
        if let Some(joined) = inner.joined.get_mut(&conn) {
            joined.remove(&conversation_id);
            if joined.is_empty() {
                inner.joined.remove(&conn);
            }
        }
    }

    /// Drop a connection from every room it joined. Called on disconnect.
    pub fn leave_all(&self, conn: ConnectionId) {
        let mut inner = self.inner.lock().expect("room lock poisoned");
        let Some(joined) = inner.joined.remove(&conn) else {
            return;
        };
        for conversation_id in joined {
            if let Some(members) = inner.members.get_mut(&conversation_id) {
                members.remove(&conn);
                if members.is_empty() {
                    inner.members.remove(&conversation_id);
                }
            }
        }
    }

    /// Current members of a conversation room.
    pub fn members(&self, conversation_id: Uuid) -> Vec<ConnectionId> {
        self.inner
            .lock()
            .expect("room lock poisoned")
            .members
            .get(&conversation_id)
            .map(|m| m.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn contains(&self, conversation_id: Uuid, conn: ConnectionId) -> bool {
        self.inner
            .lock()
            .expect("room lock poisoned")
            .members
            .get(&conversation_id)
            .is_some_and(|m| m.contains(&conn))
    }
}
