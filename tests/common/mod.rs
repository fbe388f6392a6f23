//! Common test utilities
//!
//! In-memory database fixture, seeded users, and event-channel helpers
//! shared by the integration suites.

#![allow(dead_code)]

use ripple::auth::sessions::create_token;
use ripple::auth::users::{self, User};
use ripple::realtime::event::ServerEvent;
use ripple::state::AppState;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tokio::sync::mpsc::UnboundedReceiver;

pub const TEST_SECRET: &str = "test-secret";
pub const TEST_ORIGIN: &str = "http://localhost:5173";

/// Fresh in-memory database with the schema applied.
pub async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("failed to open in-memory database");

    ripple::db::run_migrations(&pool)
        .await
        .expect("failed to run migrations");

    pool
}

/// Fresh application state over an in-memory database.
pub async fn test_state() -> AppState {
    AppState::new(test_pool().await, TEST_SECRET)
}

/// Create a user with a known password (`password123`).
pub async fn seed_user(pool: &SqlitePool, username: &str) -> User {
    // Minimum bcrypt cost keeps the suite fast.
    let hash = bcrypt::hash("password123", 4).expect("failed to hash password");
    users::create_user(
        pool,
        username,
        &format!("{username}@example.com"),
        &hash,
        username,
    )
    .await
    .expect("failed to seed user")
}

/// Mint a valid bearer token for a seeded user.
pub fn token_for(state: &AppState, user: &User) -> String {
    create_token(&state.keys, user.id, &user.email).expect("failed to mint token")
}

/// Drain every event currently queued on a connection's channel.
pub fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
