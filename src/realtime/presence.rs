//! Presence tracking
//!
//! In-memory registry of which users currently hold live connections.
//! Presence is per-user, not per-connection: a user with three devices is
//! online until the last one drops. The registry is process-local and
//! rebuilt empty on restart; the `users.is_online` column is its durable,
//! best-effort mirror.
//!
//! The tracker is constructed once at startup and handed by reference to
//! the gateway and the REST façade; nothing global.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use uuid::Uuid;

/// Opaque handle for one live connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

/// User-to-connections registry.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    inner: Mutex<HashMap<Uuid, HashSet<ConnectionId>>>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associate a connection with a user. Returns true when this was the
    /// user's first live connection (the online transition).
    pub fn register(&self, user_id: Uuid, conn: ConnectionId) -> bool {
        let mut inner = self.inner.lock().expect("presence lock poisoned");
        let connections = inner.entry(user_id).or_default();
        let was_offline = connections.is_empty();
        connections.insert(conn);
        was_offline
    }

    /// Remove a connection. Returns true when it was the user's last live
    /// connection (the offline transition).
    pub fn remove(&self, user_id: Uuid, conn: ConnectionId) -> bool {
        let mut inner = self.inner.lock().expect("presence lock poisoned");
        let Some(connections) = inner.get_mut(&user_id) else {
            return false;
        };
        connections.remove(&conn);
        if connections.is_empty() {
            inner.remove(&user_id);
            true
        } else {
            false
        }
    }

    pub fn is_online(&self, user_id: Uuid) -> bool {
        self.inner
            .lock()
            .expect("presence lock poisoned")
            .get(&user_id)
            .is_some_and(|c| !c.is_empty())
    }

    /// All live connections for a user (multi-device delivery).
    pub fn connections_for(&self, user_id: Uuid) -> Vec<ConnectionId> {
        self.inner
            .lock()
            .expect("presence lock poisoned")
            .get(&user_id)
            .map(|c| c.iter().copied().collect())
            .unwrap_or_default()
    }
}
