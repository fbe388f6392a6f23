//! Realtime gateway
//!
//! Connection handling for the hot path. Each WebSocket must open with an
//! `authenticate` frame inside [`AUTH_TIMEOUT`]; anything else closes the
//! socket before it ever reaches the authenticated state. An accepted
//! connection gets a dedicated outbound channel, shows up in the presence
//! tracker, and is bulk-joined to a room per conversation it participates
//! in, so messages arrive live even for conversations the client has not
//! opened.
//!
//! All mutations go through the chat store; fan-out happens strictly
//! after the store call returns, so a message that failed to persist is
//! never announced.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::auth::sessions::{verify_token, Keys};
use crate::auth::users::{self, User};
use crate::chat::model::{Conversation, Message};
use crate::chat::store::{ChatStore, ChatStoreError};
use crate::error::ApiError;
use crate::realtime::event::{ClientEvent, ServerEvent};
use crate::realtime::presence::{ConnectionId, PresenceTracker};
use crate::realtime::rooms::RoomRegistry;

/// How long a fresh connection may take to present its credential.
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(10);

/// The connection-handling layer: authentication, room membership, and
/// event routing between the chat store and live connections.
pub struct Gateway {
    store: ChatStore,
    pool: SqlitePool,
    keys: Keys,
    presence: Arc<PresenceTracker>,
    rooms: Arc<RoomRegistry>,
    outbox: Mutex<HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>>,
}

impl Gateway {
    pub fn new(
        store: ChatStore,
        pool: SqlitePool,
        keys: Keys,
        presence: Arc<PresenceTracker>,
        rooms: Arc<RoomRegistry>,
    ) -> Self {
        Self {
            store,
            pool,
            keys,
            presence,
            rooms,
            outbox: Mutex::new(HashMap::new()),
        }
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    pub fn rooms(&self) -> &RoomRegistry {
        &self.rooms
    }

    /// Verify a handshake credential against the user directory.
    pub async fn authenticate(&self, token: &str) -> Result<User, ApiError> {
        let claims = verify_token(&self.keys, token)
            .map_err(|_| ApiError::Authentication("invalid token".to_string()))?;
        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ApiError::Authentication("invalid token".to_string()))?;

        users::get_user_by_id(&self.pool, user_id)
            .await?
            .ok_or_else(|| ApiError::Authentication("unknown user".to_string()))
    }

    /// Register an authenticated connection: outbound channel, presence,
    /// bulk room join, and the handshake ack. Returns the receiving end
    /// of the connection's delivery channel.
    pub async fn connect(
        &self,
        user: &User,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<ServerEvent>) {
        let conn = ConnectionId::new();
        let (tx, rx) = mpsc::unbounded_channel();
        self.outbox
            .lock()
            .expect("outbox lock poisoned")
            .insert(conn, tx);

        if self.presence.register(user.id, conn) {
            // Durable mirror of the in-memory state; best effort.
            if let Err(e) = users::set_online(&self.pool, user.id).await {
                tracing::warn!("failed to persist online flag for {}: {e:?}", user.id);
            }
            self.broadcast_all_except(Some(conn), ServerEvent::UserOnline { user_id: user.id });
        }

        match self.store.conversation_ids_for(user.id).await {
            Ok(ids) => {
                for conversation_id in ids {
                    self.rooms.join(conversation_id, conn);
                }
            }
            Err(e) => {
                tracing::warn!("bulk room join failed for {}: {e:?}", user.id);
            }
        }

        self.send_to(
            conn,
            ServerEvent::Authenticated {
                user: user.public(),
            },
        );

        tracing::info!("user {} connected ({conn:?})", user.username);
        (conn, rx)
    }

    /// Tear a connection down. If it was the user's last one, the user
    /// goes offline durably and everyone still connected hears about it.
    pub async fn disconnect(&self, conn: ConnectionId, user_id: Uuid) {
        self.rooms.leave_all(conn);
        self.outbox
            .lock()
            .expect("outbox lock poisoned")
            .remove(&conn);

        if self.presence.remove(user_id, conn) {
            let last_seen = chrono::Utc::now();
            if let Err(e) = users::set_offline(&self.pool, user_id, last_seen).await {
                tracing::warn!("failed to persist offline flag for {user_id}: {e:?}");
            }
            self.broadcast_all_except(None, ServerEvent::UserOffline { user_id });
        }

        tracing::info!("connection {conn:?} closed");
    }

    /// Route one inbound event from an authenticated connection.
    pub async fn handle_event(&self, conn: ConnectionId, user: &User, event: ClientEvent) {
        match event {
            ClientEvent::Authenticate { .. } => {
                self.send_error(conn, "already authenticated");
            }

            ClientEvent::JoinConversation { conversation_id } => {
                // Membership is only granted to participants; a join for a
                // foreign or missing conversation is dropped silently.
                match self.store.conversation(conversation_id).await {
                    Ok(c) if c.has_participant(user.id) => {
                        self.rooms.join(conversation_id, conn);
                    }
                    Ok(_) | Err(ChatStoreError::ConversationNotFound) => {
                        tracing::debug!(
                            "ignoring join of {conversation_id} by non-participant {}",
                            user.id
                        );
                    }
                    Err(e) => {
                        tracing::warn!("join-conversation lookup failed: {e:?}");
                    }
                }
            }

            ClientEvent::LeaveConversation { conversation_id } => {
                self.rooms.leave(conversation_id, conn);
            }

            ClientEvent::SendMessage {
                conversation_id,
                content,
            } => {
                match self
                    .store
                    .append_message(conversation_id, user.id, &content)
                    .await
                {
                    Ok(message) => match self.store.conversation(conversation_id).await {
                        Ok(conversation) => {
                            self.fan_out_message(&conversation, &message).await;
                        }
                        Err(e) => {
                            tracing::error!("conversation vanished after append: {e:?}");
                            self.send_error(conn, "failed to send message");
                        }
                    },
                    Err(e) => self.send_store_error(conn, e),
                }
            }

            ClientEvent::TypingStart { conversation_id } => {
                self.relay_to_room_except(
                    conversation_id,
                    conn,
                    ServerEvent::UserTyping {
                        conversation_id,
                        user_id: user.id,
                        username: user.username.clone(),
                    },
                );
            }

            ClientEvent::TypingStop { conversation_id } => {
                self.relay_to_room_except(
                    conversation_id,
                    conn,
                    ServerEvent::UserStoppedTyping {
                        conversation_id,
                        user_id: user.id,
                    },
                );
            }

            ClientEvent::MarkRead { conversation_id } => {
                match self
                    .store
                    .mark_conversation_read(conversation_id, user.id)
                    .await
                {
                    Ok(0) => {}
                    Ok(_) => {
                        self.relay_to_room_except(
                            conversation_id,
                            conn,
                            ServerEvent::MessagesRead {
                                conversation_id,
                                user_id: user.id,
                            },
                        );
                    }
                    Err(e) => self.send_store_error(conn, e),
                }
            }
        }
    }

    /// Announce a durably stored message: `new-message` to the
    /// conversation room, `conversation-updated` to every participant
    /// connection that is not watching the room. Shared by the gateway's
    /// `send-message` handler and the REST send path.
    pub async fn fan_out_message(&self, conversation: &Conversation, message: &Message) {
        for conn in self.rooms.members(conversation.id) {
            self.send_to(
                conn,
                ServerEvent::NewMessage {
                    conversation_id: conversation.id,
                    message: message.clone(),
                },
            );
        }

        for participant in conversation.participants() {
            for conn in self.presence.connections_for(participant) {
                if !self.rooms.contains(conversation.id, conn) {
                    self.send_to(
                        conn,
                        ServerEvent::ConversationUpdated {
                            conversation_id: conversation.id,
                            last_message: message.clone(),
                        },
                    );
                }
            }
        }
    }

    fn relay_to_room_except(&self, conversation_id: Uuid, origin: ConnectionId, event: ServerEvent) {
        for conn in self.rooms.members(conversation_id) {
            if conn != origin {
                self.send_to(conn, event.clone());
            }
        }
    }

    fn broadcast_all_except(&self, origin: Option<ConnectionId>, event: ServerEvent) {
        let outbox = self.outbox.lock().expect("outbox lock poisoned");
        for (conn, tx) in outbox.iter() {
            if Some(*conn) != origin {
                let _ = tx.send(event.clone());
            }
        }
    }

    fn send_to(&self, conn: ConnectionId, event: ServerEvent) {
        let outbox = self.outbox.lock().expect("outbox lock poisoned");
        if let Some(tx) = outbox.get(&conn) {
            // A closed receiver means the connection is tearing down.
            let _ = tx.send(event);
        }
    }

    fn send_error(&self, conn: ConnectionId, message: &str) {
        self.send_to(
            conn,
            ServerEvent::Error {
                message: message.to_string(),
            },
        );
    }

    fn send_store_error(&self, conn: ConnectionId, err: ChatStoreError) {
        self.send_to(
            conn,
            ServerEvent::Error {
                message: ApiError::from(err).public_message(),
            },
        );
    }

    /// Drive one accepted WebSocket for its whole lifetime.
    pub async fn handle_socket(self: Arc<Self>, socket: WebSocket) {
        let (mut sink, mut stream) = socket.split();

        // Handshake: first frame must authenticate, within the deadline.
        let first = tokio::time::timeout(AUTH_TIMEOUT, next_client_event(&mut stream)).await;
        let user = match first {
            Ok(Some(ClientEvent::Authenticate { token })) => {
                match self.authenticate(&token).await {
                    Ok(user) => user,
                    Err(e) => {
                        tracing::warn!("websocket authentication failed: {e}");
                        send_raw(&mut sink, &ServerEvent::Error {
                            message: "authentication failed".to_string(),
                        })
                        .await;
                        return;
                    }
                }
            }
            Ok(_) => {
                send_raw(&mut sink, &ServerEvent::Error {
                    message: "expected authenticate".to_string(),
                })
                .await;
                return;
            }
            Err(_) => {
                tracing::debug!("websocket authentication timed out");
                send_raw(&mut sink, &ServerEvent::Error {
                    message: "authentication timeout".to_string(),
                })
                .await;
                return;
            }
        };

        let (conn, mut rx) = self.connect(&user).await;

        // Writer half: delivery channel -> socket.
        let mut send_task = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let Ok(text) = serde_json::to_string(&event) else {
                    continue;
                };
                if sink.send(WsMessage::Text(text.into())).await.is_err() {
                    break;
                }
            }
        });

        // Reader half: socket -> event dispatch.
        let gateway = self.clone();
        let reader_user = user.clone();
        let mut recv_task = tokio::spawn(async move {
            while let Some(Ok(frame)) = stream.next().await {
                match frame {
                    WsMessage::Text(text) => match serde_json::from_str::<ClientEvent>(&text) {
                        Ok(event) => gateway.handle_event(conn, &reader_user, event).await,
                        Err(_) => gateway.send_error(conn, "unrecognized event"),
                    },
                    WsMessage::Close(_) => break,
                    _ => {}
                }
            }
        });

        tokio::select! {
            _ = &mut send_task => recv_task.abort(),
            _ = &mut recv_task => send_task.abort(),
        }

        self.disconnect(conn, user.id).await;
    }
}

/// `GET /ws` — upgrade and hand the socket to the gateway.
pub async fn websocket_handler(
    State(state): State<crate::state::AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| state.gateway.clone().handle_socket(socket))
}

/// Read frames until a parsable client event, a close, or end of stream.
async fn next_client_event(
    stream: &mut (impl Stream<Item = Result<WsMessage, axum::Error>> + Unpin),
) -> Option<ClientEvent> {
    while let Some(Ok(frame)) = stream.next().await {
        match frame {
            WsMessage::Text(text) => return serde_json::from_str(&text).ok(),
            WsMessage::Close(_) => return None,
            _ => {}
        }
    }
    None
}

async fn send_raw(
    sink: &mut (impl Sink<WsMessage, Error = axum::Error> + Unpin),
    event: &ServerEvent,
) {
    if let Ok(text) = serde_json::to_string(event) {
        let _ = sink.send(WsMessage::Text(text.into())).await;
    }
}
