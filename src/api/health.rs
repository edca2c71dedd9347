// src/api/health.rs
// Liveness probe. Unauthenticated, no state lookups — just confirms the
// process is up and answering requests.

use axum::response::IntoResponse;
use axum::Json;

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
