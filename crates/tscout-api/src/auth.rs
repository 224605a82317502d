//! Bearer-token authentication.
//!
//! Tokens are HS256 JWTs whose `sub` claim carries the internal user id.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
struct Claims {
    sub: String,
    #[allow(dead_code)]
    exp: usize,
}

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub uid: String,
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("missing Authorization header"))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("expected Bearer token"))?;

        if state.config.jwt_secret.is_empty() {
            return Err(ApiError::internal("JWT_SECRET not configured"));
        }

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| ApiError::unauthorized(format!("invalid token: {e}")))?;

        if decoded.claims.sub.is_empty() {
            return Err(ApiError::unauthorized("token has no subject"));
        }

        Ok(AuthUser {
            uid: decoded.claims.sub,
        })
    }
}
