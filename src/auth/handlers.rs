//! Authentication handlers
//!
//! `POST /auth/signup` and `POST /auth/login`. Both return a bearer token
//! plus the public profile; every other endpoint expects that token in the
//! `Authorization` header, and the realtime gateway expects it in the
//! handshake frame.
//!
//! Invalid credentials always answer 401 without distinguishing "unknown
//! email" from "wrong password".

use axum::extract::State;
use axum::response::Json;
use bcrypt::{hash, verify, DEFAULT_COST};
use serde::{Deserialize, Serialize};

use crate::auth::sessions::create_token;
use crate::auth::users::{self, UserPublic};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserPublic,
}

/// Register a new account and return a session token.
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let username = request.username.trim();
    let email = request.email.trim();
    let display_name = request.display_name.trim();

    if username.is_empty() || email.is_empty() || display_name.is_empty() {
        return Err(ApiError::Validation(
            "username, email, and display name are required".to_string(),
        ));
    }
    if request.password.len() < 8 {
        return Err(ApiError::Validation(
            "password must be at least 8 characters".to_string(),
        ));
    }

    if users::get_user_by_email(&state.pool, email).await?.is_some() {
        return Err(ApiError::Validation("email already exists".to_string()));
    }
    if users::get_user_by_username(&state.pool, username)
        .await?
        .is_some()
    {
        return Err(ApiError::Validation("username already exists".to_string()));
    }

    let password_hash = hash(&request.password, DEFAULT_COST)
        .map_err(|e| ApiError::Authentication(format!("failed to hash password: {e}")))?;

    let user = users::create_user(&state.pool, username, email, &password_hash, display_name)
        .await?;

    let token = create_token(&state.keys, user.id, &user.email)
        .map_err(|e| ApiError::Authentication(format!("failed to create token: {e}")))?;

    tracing::info!("user registered: {}", user.username);

    Ok(Json(AuthResponse {
        token,
        user: user.public(),
    }))
}

/// Verify credentials and return a session token.
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = users::get_user_by_email(&state.pool, request.email.trim())
        .await?
        .ok_or_else(|| {
            tracing::warn!("login attempt for unknown email");
            ApiError::Authentication("invalid credentials".to_string())
        })?;

    let valid = verify(&request.password, &user.password_hash)
        .map_err(|e| ApiError::Authentication(format!("password verification failed: {e}")))?;

    if !valid {
        tracing::warn!("invalid password for user: {}", user.username);
        return Err(ApiError::Authentication("invalid credentials".to_string()));
    }

    let token = create_token(&state.keys, user.id, &user.email)
        .map_err(|e| ApiError::Authentication(format!("failed to create token: {e}")))?;

    tracing::info!("user logged in: {}", user.username);

    Ok(Json(AuthResponse {
        token,
        user: user.public(),
    }))
}
