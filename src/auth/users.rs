//! User directory
//!
//! User records and their database operations. The full `User` row (with
//! password hash) never crosses the wire; handlers project it to
//! [`UserPublic`] before responding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

/// Full user row as stored.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub is_online: bool,
    pub last_seen: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Project to the fields other users are allowed to see.
    pub fn public(&self) -> UserPublic {
        UserPublic {
            id: self.id,
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            avatar_url: self.avatar_url.clone(),
            is_online: self.is_online,
            last_seen: self.last_seen,
        }
    }
}

/// Public projection of a user, embedded in conversation summaries and
/// handshake acks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserPublic {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub is_online: bool,
    pub last_seen: Option<DateTime<Utc>>,
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        display_name: row.get("display_name"),
        avatar_url: row.get("avatar_url"),
        is_online: row.get("is_online"),
        last_seen: row.get("last_seen"),
        created_at: row.get("created_at"),
    }
}

const SELECT_USER: &str = "SELECT id, username, email, password_hash, display_name, avatar_url, \
                           is_online, last_seen, created_at FROM users";

/// Create a new user. The caller supplies the bcrypt hash.
pub async fn create_user(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    password_hash: &str,
    display_name: &str,
) -> Result<User, sqlx::Error> {
    let id = Uuid::new_v4();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO users (id, username, email, password_hash, display_name, is_online, created_at)
        VALUES ($1, $2, $3, $4, $5, false, $6)
        "#,
    )
    .bind(id)
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(display_name)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(User {
        id,
        username: username.to_string(),
        email: email.to_string(),
        password_hash: password_hash.to_string(),
        display_name: display_name.to_string(),
        avatar_url: None,
        is_online: false,
        last_seen: None,
        created_at: now,
    })
}

/// Look up a user by email.
pub async fn get_user_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query(&format!("{SELECT_USER} WHERE email = $1"))
        .bind(email)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(row_to_user))
}

/// Look up a user by username.
pub async fn get_user_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query(&format!("{SELECT_USER} WHERE username = $1"))
        .bind(username)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(row_to_user))
}

/// Look up a user by id.
pub async fn get_user_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<User>, sqlx::Error> {
    let row = sqlx::query(&format!("{SELECT_USER} WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(row_to_user))
}

/// Mark a user online. Called when their first realtime connection lands.
pub async fn set_online(pool: &SqlitePool, user_id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET is_online = true WHERE id = $1")
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Mark a user offline and stamp last-seen. Called when their last
/// realtime connection drops.
pub async fn set_offline(
    pool: &SqlitePool,
    user_id: Uuid,
    last_seen: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET is_online = false, last_seen = $1 WHERE id = $2")
        .bind(last_seen)
        .bind(user_id)
        .execute(pool)
        .await?;

    Ok(())
}
