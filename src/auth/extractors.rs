use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::{
    auth::jwt::{Claims, SessionKeys, TokenError},
    error::ApiError,
    state::AppState,
};

/// Guard for protected routes: extracts and verifies the bearer token and
/// hands the verified claims to the handler. No store lookup happens here, so
/// a deleted user's token stays valid until it expires.
pub struct AuthUser(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let keys = SessionKeys::from_ref(state);

        let token = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer ").or_else(|| h.strip_prefix("bearer ")))
            .ok_or_else(|| ApiError::Auth(TokenError::Missing.to_string()))?;

        let claims = keys
            .verify(token)
            .map_err(|e| ApiError::Auth(e.to_string()))?;

        Ok(AuthUser(claims))
    }
}
