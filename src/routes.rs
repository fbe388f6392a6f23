//! Router assembly
//!
//! Public routes (auth, the WebSocket upgrade — which authenticates
//! in-protocol) and the bearer-protected chat routes, wrapped in CORS for
//! the configured client origin and request tracing.

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::handlers::{login, signup};
use crate::chat::handlers::{create_chat, get_messages, list_chats, send_message};
use crate::middleware::auth::auth_middleware;
use crate::realtime::gateway::websocket_handler;
use crate::state::AppState;

/// Build the application router.
pub fn create_app(state: AppState, client_origin: &str) -> Router {
    let cors = match client_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods(Any)
            .allow_headers(Any),
        Err(_) => {
            tracing::warn!("invalid CLIENT_ORIGIN {client_origin:?}, cross-origin disabled");
            CorsLayer::new()
        }
    };

    let protected = Router::new()
        .route("/chats", get(list_chats))
        .route("/chats/create/{user_id}", post(create_chat))
        .route("/chats/{id}/messages", get(get_messages).post(send_message))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/ws", get(websocket_handler))
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
