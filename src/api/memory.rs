// src/api/memory.rs
// `Gateway ↔ memory service` HTTP JSON surface (§6): thin handlers over
// `MemoryService`, gated by `InternalCaller` rather than a bearer token —
// these routes are reached by platform collaborators, not end users
// directly, per "All of the above require a service-to-service header
// (x-internal-service) and propagate x-user-id."

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::InternalCaller;
use crate::config::Tier;
use crate::error::CoreResult;
use crate::memory::recall::RecallRequest;
use crate::memory::Role;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateMemoryBody {
    pub thread_id: String,
    pub content: String,
    pub priority: Option<f32>,
    pub tier: Option<Tier>,
}

pub async fn create_memory(
    State(state): State<AppState>,
    caller: InternalCaller,
    Json(body): Json<CreateMemoryBody>,
) -> CoreResult<impl axum::response::IntoResponse> {
    let memory = state
        .memory
        .create_memory(&caller.user_id, &body.thread_id, &body.content, body.priority, body.tier)
        .await?;
    Ok(Json(memory))
}

#[derive(Debug, Deserialize)]
pub struct ListMemoriesQuery {
    pub thread_id: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}

pub async fn list_memories(
    State(state): State<AppState>,
    caller: InternalCaller,
    Query(query): Query<ListMemoriesQuery>,
) -> CoreResult<impl axum::response::IntoResponse> {
    let memories = state
        .memory
        .list_memories(&caller.user_id, query.thread_id.as_deref(), query.limit, query.offset)
        .await?;
    Ok(Json(memories))
}

#[derive(Debug, Deserialize)]
pub struct PatchMemoryBody {
    pub content: Option<String>,
    pub priority: Option<f32>,
    pub tier: Option<Tier>,
    #[serde(default)]
    pub deleted: bool,
}

pub async fn patch_memory(
    State(state): State<AppState>,
    _caller: InternalCaller,
    Path(memory_id): Path<String>,
    Json(body): Json<PatchMemoryBody>,
) -> CoreResult<impl axum::response::IntoResponse> {
    let memory = state
        .memory
        .patch_memory(&memory_id, body.content.as_deref(), body.priority, body.tier, body.deleted)
        .await?;
    Ok(Json(memory))
}

#[derive(Debug, Deserialize)]
pub struct RecallQuery {
    pub thread_id: String,
    pub query: String,
    pub max_items: Option<usize>,
    pub deadline_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct RecallResponse {
    memories: Vec<crate::memory::Memory>,
}

pub async fn recall(
    State(state): State<AppState>,
    caller: InternalCaller,
    Query(query): Query<RecallQuery>,
) -> Json<RecallResponse> {
    let memories = state
        .memory
        .recall(RecallRequest {
            user_id: &caller.user_id,
            thread_id: &query.thread_id,
            query: &query.query,
            max_items: query.max_items,
            deadline_ms: query.deadline_ms,
        })
        .await;
    Json(RecallResponse { memories })
}

#[derive(Debug, Deserialize)]
pub struct MessageEventBody {
    pub thread_id: String,
    pub message_id: String,
    pub role: Role,
    pub content: String,
    pub tokens_in: Option<i64>,
    pub tokens_out: Option<i64>,
}

/// Fire-and-forget per §6: the caller does not wait on the audit outcome.
pub async fn ingest_message_event(
    State(state): State<AppState>,
    caller: InternalCaller,
    Json(body): Json<MessageEventBody>,
) -> CoreResult<impl axum::response::IntoResponse> {
    state
        .memory
        .ingest_message_event(
            &caller.user_id,
            &body.thread_id,
            &body.message_id,
            body.role,
            &body.content,
            body.tokens_in,
            body.tokens_out,
        )
        .await?;
    Ok(axum::http::StatusCode::ACCEPTED)
}

#[derive(Debug, Deserialize)]
pub struct ConversationsQuery {
    #[serde(default = "default_conversations_limit")]
    pub limit: i64,
}

fn default_conversations_limit() -> i64 {
    20
}

pub async fn conversations(
    State(state): State<AppState>,
    caller: InternalCaller,
    Query(query): Query<ConversationsQuery>,
) -> CoreResult<impl axum::response::IntoResponse> {
    let headers = state.memory.conversations(&caller.user_id, query.limit).await?;
    Ok(Json(headers))
}

pub async fn profile(
    State(state): State<AppState>,
    caller: InternalCaller,
) -> CoreResult<impl axum::response::IntoResponse> {
    let profile = state.memory.profile(&caller.user_id).await?;
    Ok(Json(profile))
}
