//! API error taxonomy
//!
//! Every HTTP handler returns `Result<_, ApiError>`. The enum mirrors the
//! failure classes the product distinguishes: bad credentials close the
//! door with 401, an authenticated caller touching someone else's
//! conversation gets 403, malformed input 400, absent records 404, and
//! storage failures surface as 500 without leaking driver details.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use thiserror::Error;

use crate::chat::store::ChatStoreError;

/// Errors returned from HTTP handlers and the realtime gateway.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, malformed, or expired credential
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Authenticated, but not allowed to touch the resource
    #[error("not authorized: {0}")]
    Authorization(String),

    /// Request was understood but semantically invalid
    #[error("invalid request: {0}")]
    Validation(String),

    /// Referenced record does not exist
    #[error("not found: {0}")]
    NotFound(String),

    /// Durable storage call failed
    #[error("storage error")]
    Database(#[from] sqlx::Error),

    /// Payload could not be encoded
    #[error("serialization error")]
    Serialization(#[from] serde_json::Error),
}

impl ApiError {
    /// HTTP status the error maps to.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Authentication(_) => StatusCode::UNAUTHORIZED,
            Self::Authorization(_) => StatusCode::FORBIDDEN,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Database(_) | Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the caller.
    pub fn public_message(&self) -> String {
        match self {
            // Internal detail stays in the logs.
            Self::Database(_) => "storage error".to_string(),
            Self::Serialization(_) => "internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<ChatStoreError> for ApiError {
    fn from(err: ChatStoreError) -> Self {
        match err {
            ChatStoreError::SelfConversation => {
                Self::Validation("cannot start a conversation with yourself".to_string())
            }
            ChatStoreError::EmptyContent => {
                Self::Validation("message content is required".to_string())
            }
            ChatStoreError::ContentTooLong(max) => {
                Self::Validation(format!("message content exceeds {max} characters"))
            }
            ChatStoreError::NotParticipant => {
                Self::Authorization("not a participant in this conversation".to_string())
            }
            ChatStoreError::ConversationNotFound => {
                Self::NotFound("conversation not found".to_string())
            }
            ChatStoreError::UserNotFound => Self::NotFound("user not found".to_string()),
            ChatStoreError::Database(err) => Self::Database(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("request failed: {self:?}");
        } else {
            tracing::debug!("request rejected: {self}");
        }

        let body = Json(serde_json::json!({ "message": self.public_message() }));
        (status, body).into_response()
    }
}
