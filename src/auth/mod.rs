// src/auth/mod.rs

pub mod jwt;

pub use jwt::Claims;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::RequestPartsExt;
use axum_extra::headers::{authorization::Bearer, Authorization};
use axum_extra::TypedHeader;

use crate::error::CoreError;

/// The authenticated caller for a request, extracted from the bearer token
/// on every route that isn't `/health` (§4.1 step 1).
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub username: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = CoreError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| CoreError::Unauthenticated)?;

        let claims = jwt::verify_token(bearer.token()).map_err(|_| CoreError::Unauthenticated)?;

        let _ = state;
        Ok(AuthUser {
            user_id: claims.sub,
            username: claims.username,
        })
    }
}

impl AuthUser {
    #[cfg(test)]
    pub fn test_user(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            username: user_id.to_string(),
        }
    }
}

/// The memory-service surface (§6 "Gateway ↔ memory service") is reached
/// over the same HTTP listener here, but still required to carry the
/// service-to-service header and a propagated `x-user-id` rather than a
/// bearer token — the caller is another part of the platform, not an
/// end-user's browser.
#[derive(Debug, Clone)]
pub struct InternalCaller {
    pub user_id: String,
}

impl<S> FromRequestParts<S> for InternalCaller
where
    S: Send + Sync,
{
    type Rejection = CoreError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if !parts.headers.contains_key("x-internal-service") {
            return Err(CoreError::Forbidden);
        }
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .ok_or(CoreError::Unauthenticated)?
            .to_string();
        Ok(InternalCaller { user_id })
    }
}
