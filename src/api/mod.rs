// src/api/mod.rs
// HTTP surface: router assembly (CORS + tracing layered over a nested
// `/api` router, health check at the root).

pub mod chat;
pub mod health;
pub mod memory;

use axum::routing::{get, patch, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);

    let api_router = Router::new()
        .route("/chat/stream", post(chat::chat_stream))
        .route("/memories", get(memory::list_memories).post(memory::create_memory))
        .route("/memories/{id}", patch(memory::patch_memory))
        .route("/recall", get(memory::recall))
        .route("/events/message", post(memory::ingest_message_event))
        .route("/conversations", get(memory::conversations))
        .route("/profile", get(memory::profile))
        .with_state(state.clone());

    Router::new()
        .route("/health", get(health::health))
        .route("/metrics", get(crate::metrics::metrics_handler))
        .nest("/api", api_router)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
