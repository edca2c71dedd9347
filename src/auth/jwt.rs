// src/auth/jwt.rs
// Bearer-token validation. The identity provider that issues these tokens is
// an external collaborator (§1 Non-goals); this module only verifies them
// and extracts the stable `userId` they carry.

use anyhow::{anyhow, Result};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub exp: usize,
    pub iat: usize,
}

fn jwt_secret() -> String {
    env::var("JWT_SECRET").unwrap_or_else(|_| "threadline-dev-secret-change-me".to_string())
}

pub fn verify_token(token: &str) -> Result<Claims> {
    let key = DecodingKey::from_secret(jwt_secret().as_bytes());
    let validation = Validation::default();

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| anyhow!("invalid token: {e}"))
}

#[cfg(test)]
pub fn sign_test_token(user_id: &str, username: &str) -> Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = chrono::Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: user_id.to_string(),
        username: username.to_string(),
        exp: now + 3600,
        iat: now,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(jwt_secret().as_bytes()))
        .map_err(|e| anyhow!("failed to sign test token: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_valid_token() {
        let token = sign_test_token("user-1", "ada").unwrap();
        let claims = verify_token(&token).unwrap();
        assert_eq!(claims.sub, "user-1");
        assert_eq!(claims.username, "ada");
    }

    #[test]
    fn rejects_garbage() {
        assert!(verify_token("not-a-jwt").is_err());
    }
}
