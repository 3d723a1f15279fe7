//! Handlers for the `/auth` resource (login, refresh, logout, me).

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tally_core::error::CoreError;
use tally_db::models::session::CreateSession;
use tally_db::models::user::{User, UserResponse};

use crate::auth::cookie::{append_set_cookie, clear_session_cookie, session_cookie};
use crate::auth::jwt::{issue_tokens, refresh_token_digest};
use crate::auth::password::verify_password;
use crate::error::{AppError, AppResult};
use crate::extract::Json;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Request body for `POST /auth/refresh`.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Successful authentication response returned by login and refresh.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserResponse,
}

/// POST /api/v1/auth/login
///
/// Authenticate with username + password. Returns access and refresh tokens
/// and sets the session cookie.
pub async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> AppResult<(HeaderMap, Json<DataResponse<AuthResponse>>)> {
    let invalid = || {
        AppError::Core(CoreError::Unauthorized(
            "Invalid username or password".into(),
        ))
    };

    let user = state
        .storage
        .find_user_by_username(&input.username)
        .await?
        .ok_or_else(invalid)?;

    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    let password_valid = verify_password(&input.password, &user.password_hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !password_valid {
        tracing::info!(username = %input.username, "Failed login attempt");
        return Err(invalid());
    }

    state.storage.record_login(user.id).await?;
    tracing::info!(user_id = user.id, role = %user.role, "User logged in");

    issue_session(&state, user).await
}

/// POST /api/v1/auth/refresh
///
/// Exchange a valid refresh token for new tokens. The old session is revoked.
pub async fn refresh(
    State(state): State<AppState>,
    Json(input): Json<RefreshRequest>,
) -> AppResult<(HeaderMap, Json<DataResponse<AuthResponse>>)> {
    let token_hash = refresh_token_digest(&input.refresh_token);

    let session = state
        .storage
        .find_active_session(&token_hash)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Invalid or expired refresh token".into(),
            ))
        })?;

    state.storage.revoke_session(session.id).await?;

    let user = state
        .storage
        .find_user(session.user_id)
        .await?
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;

    if !user.is_active {
        return Err(AppError::Core(CoreError::Forbidden(
            "Account is deactivated".into(),
        )));
    }

    issue_session(&state, user).await
}

/// POST /api/v1/auth/logout
///
/// Revoke every session of the caller and clear the cookie. Returns 204.
pub async fn logout(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<(StatusCode, HeaderMap)> {
    let revoked = state.storage.revoke_user_sessions(auth_user.user_id).await?;
    tracing::info!(user_id = auth_user.user_id, revoked, "User logged out");

    let mut headers = HeaderMap::new();
    append_set_cookie(&mut headers, &clear_session_cookie(state.config.cookie_secure));
    Ok((StatusCode::NO_CONTENT, headers))
}

/// GET /api/v1/auth/me
pub async fn me(
    State(state): State<AppState>,
    auth_user: AuthUser,
) -> AppResult<Json<DataResponse<UserResponse>>> {
    let user = state
        .storage
        .find_user(auth_user.user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("User no longer exists".into())))?;
    Ok(Json(DataResponse::new(user.into())))
}

/// Generate tokens, persist a session row and build the cookie + body.
async fn issue_session(
    state: &AppState,
    user: User,
) -> AppResult<(HeaderMap, Json<DataResponse<AuthResponse>>)> {
    let jwt = &state.config.jwt;
    let tokens = issue_tokens(user.id, user.role, jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    state
        .storage
        .create_session(&CreateSession {
            user_id: user.id,
            refresh_token_hash: tokens.refresh_token_hash,
            expires_at: jwt.refresh_expires_at(Utc::now()),
        })
        .await?;

    let mut headers = HeaderMap::new();
    append_set_cookie(
        &mut headers,
        &session_cookie(
            &tokens.access_token,
            tokens.expires_in,
            state.config.cookie_secure,
        ),
    );

    let body = AuthResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        expires_in: tokens.expires_in,
        user: user.into(),
    };
    Ok((headers, Json(DataResponse::new(body))))
}
