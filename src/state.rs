//! Application state
//!
//! The composition root. Everything with shared state — the pool, the
//! chat store, the signing keys, and the gateway with its presence and
//! room registries — is constructed once here and injected by reference;
//! there are no globals, and tests build a fresh state per case.

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::auth::sessions::Keys;
use crate::chat::store::ChatStore;
use crate::realtime::gateway::Gateway;
use crate::realtime::presence::PresenceTracker;
use crate::realtime::rooms::RoomRegistry;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub store: ChatStore,
    pub keys: Keys,
    pub gateway: Arc<Gateway>,
}

impl AppState {
    pub fn new(pool: SqlitePool, jwt_secret: &str) -> Self {
        let keys = Keys::new(jwt_secret);
        let store = ChatStore::new(pool.clone());
        let presence = Arc::new(PresenceTracker::new());
        let rooms = Arc::new(RoomRegistry::new());
        let gateway = Arc::new(Gateway::new(
            store.clone(),
            pool.clone(),
            keys.clone(),
            presence,
            rooms,
        ));

        Self {
            pool,
            store,
            keys,
            gateway,
        }
    }
}
