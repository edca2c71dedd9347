// src/error.rs
// Error taxonomy for the gateway, memory service, and recall subsystem.
//
// Kinds map directly onto §7 of the design: validation/auth/rate-limit errors
// are rejected outright, storage/upstream errors degrade gracefully off the
// critical path, and dedup handles integrity violations instead of failing.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("unauthenticated")]
    Unauthenticated,

    #[error("forbidden")]
    Forbidden,

    #[error("rate limited")]
    RateLimited,

    #[error("backpressure: too many concurrent streams")]
    Backpressure,

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("integrity error: {0}")]
    Integrity(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    /// Error code surfaced on SSE `error` events and HTTP bodies (§6).
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "bad_request",
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden => "forbidden",
            Self::RateLimited => "rate_limited",
            Self::Backpressure => "rate_limited",
            Self::Upstream(_) => "upstream_error",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::Storage(_) => "upstream_error",
            Self::Integrity(_) => "bad_request",
            Self::Internal(_) => "upstream_error",
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::RateLimited | Self::Backpressure => StatusCode::TOO_MANY_REQUESTS,
            Self::DeadlineExceeded => StatusCode::OK, // never surfaced to callers directly
            Self::Integrity(_) => StatusCode::CONFLICT,
            Self::Upstream(_) | Self::Storage(_) | Self::Internal(_) => {
                StatusCode::BAD_GATEWAY
            }
        };

        // No internal state leaks into the body (auth failures especially).
        let body = serde_json::json!({
            "code": self.code(),
            "message": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}
