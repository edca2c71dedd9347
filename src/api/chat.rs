// src/api/chat.rs
// `POST /chat/stream` (§6 "Gateway ↔ client"): admit, then hand the turn to
// the orchestrator and relay its `ChatEvent`s as SSE (mpsc channel fed by
// a spawned task, converted to SSE via `async_stream::stream!`).

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::stream::Stream;
use tokio::sync::mpsc;

use crate::auth::AuthUser;
use crate::error::CoreError;
use crate::gateway::{ChatEvent, ChatTurnRequest};
use crate::state::AppState;

const EVENT_CHANNEL_CAPACITY: usize = 100;

pub async fn chat_stream(
    State(state): State<AppState>,
    user: AuthUser,
    Json(request): Json<ChatTurnRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, CoreError> {
    if !state.rate_limiter.check(&user.user_id) {
        crate::metrics::record_rate_limited();
        return Err(CoreError::RateLimited);
    }

    let Some(permit) = state.concurrency.try_acquire(&user.user_id) else {
        crate::metrics::record_backpressure();
        return Err(CoreError::Backpressure);
    };

    crate::metrics::stream_opened();

    let (tx, mut rx) = mpsc::channel::<ChatEvent>(EVENT_CHANNEL_CAPACITY);
    let orchestrator = state.orchestrator.clone();
    let user_id = user.user_id.clone();

    tokio::spawn(async move {
        // Held for the lifetime of the turn so the permit is released only
        // once the orchestrator is done sending events (§5: "excess requests
        // fail with backpressure" — the slot stays occupied for the whole
        // stream, not just the initial request).
        let _permit = permit;
        orchestrator.run_turn(&user_id, request, tx).await;
        crate::metrics::stream_closed();
    });

    let stream = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            yield Ok(event.into_sse());
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
