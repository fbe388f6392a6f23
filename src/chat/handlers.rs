//! REST façade for chat
//!
//! The cold path: listing chats, fetching history, and sending messages
//! over plain HTTP, available whether or not the client holds a live
//! realtime connection. Sends are routed through the same fan-out logic
//! as the gateway's `send-message` handler, so recipients with open
//! sockets see REST-sent messages live.

use axum::extract::{Path, Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::chat::model::{ConversationSummary, Message};
use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::AppState;

/// Default page size for chat history.
const DEFAULT_PAGE_SIZE: u32 = 50;
/// Cap on client-requested page size.
const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Serialize)]
pub struct ChatsResponse {
    pub chats: Vec<ConversationSummary>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub chat: ConversationSummary,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub messages: Vec<Message>,
    pub has_more: bool,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: Message,
}

/// `GET /chats` — the caller's conversations, most recent first.
pub async fn list_chats(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<ChatsResponse>, ApiError> {
    let chats = state.store.list_conversations(user.user_id).await?;
    Ok(Json(ChatsResponse { chats }))
}

/// `POST /chats/create/{userId}` — get or create the conversation with
/// another user.
pub async fn create_chat(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(other_id): Path<Uuid>,
) -> Result<Json<ChatResponse>, ApiError> {
    let conversation = state
        .store
        .get_or_create_conversation(user.user_id, other_id)
        .await?;

    let summary = state
        .store
        .list_conversations(user.user_id)
        .await?
        .into_iter()
        .find(|c| c.id == conversation.id)
        .ok_or_else(|| ApiError::NotFound("conversation not found".to_string()))?;

    Ok(Json(ChatResponse { chat: summary }))
}

/// `GET /chats/{id}/messages?page&limit` — paginated history. Fetching a
/// page marks its incoming messages as read by the caller.
pub async fn get_messages(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(conversation_id): Path<Uuid>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let history = state
        .store
        .list_messages(conversation_id, user.user_id, page, limit)
        .await?;

    Ok(Json(HistoryResponse {
        messages: history.messages,
        has_more: history.has_more,
    }))
}

/// `POST /chats/{id}/messages` — append a message over HTTP, then fan out
/// exactly as the gateway would.
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(conversation_id): Path<Uuid>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let message = state
        .store
        .append_message(conversation_id, user.user_id, &request.content)
        .await?;

    let conversation = state.store.conversation(conversation_id).await?;
    state.gateway.fan_out_message(&conversation, &message).await;

    Ok(Json(MessageResponse { message }))
}
