//! Caller identity extractor.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use tally_core::error::CoreError;
use tally_core::roles::Role;
use tally_core::types::DbId;

use crate::auth::cookie::read_session_cookie;
use crate::auth::jwt::decode_access_token;
use crate::error::AppError;
use crate::state::AppState;

/// The authenticated caller.
///
/// The access token comes from `Authorization: Bearer <token>` when that
/// header is present, otherwise from the session cookie. Handlers that take
/// an `AuthUser` reject anonymous requests with 401.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: DbId,
    pub role: Role,
}

fn unauthorized(message: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(message.to_string()))
}

/// Pick the presented token. A malformed `Authorization` header is an error
/// even when a cookie is also present.
fn presented_token(headers: &HeaderMap) -> Result<&str, AppError> {
    match headers.get(AUTHORIZATION) {
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| unauthorized("Invalid Authorization format. Expected: Bearer <token>")),
        None => read_session_cookie(headers).ok_or_else(|| unauthorized("Authentication required")),
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = presented_token(&parts.headers)?;
        let claims = decode_access_token(token, &state.config.jwt)
            .map_err(|_| unauthorized("Invalid or expired token"))?;

        Ok(AuthUser {
            user_id: claims.sub,
            role: claims.role,
        })
    }
}
