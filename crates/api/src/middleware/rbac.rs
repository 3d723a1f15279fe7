//! Role gates for whole routes.
//!
//! Status-dependent decisions (may this entry be posted?) go through
//! `tally_core::capabilities` instead; these extractors only check the role.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tally_core::error::CoreError;
use tally_core::roles::Role;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

async fn user_with_role(
    parts: &mut Parts,
    state: &AppState,
    allowed: fn(Role) -> bool,
    denied: &str,
) -> Result<AuthUser, AppError> {
    let user = AuthUser::from_request_parts(parts, state).await?;
    if allowed(user.role) {
        Ok(user)
    } else {
        tracing::debug!(user_id = user.user_id, role = %user.role, "Role gate denied request");
        Err(AppError::Core(CoreError::Forbidden(denied.to_string())))
    }
}

/// Client and user administration.
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        user_with_role(parts, state, Role::is_privileged, "Admin role required")
            .await
            .map(RequireAdmin)
    }
}

/// Bookkeeping writes: entities, accounts and draft entries. Viewers get 403.
pub struct RequireWriter(pub AuthUser);

impl FromRequestParts<AppState> for RequireWriter {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        user_with_role(
            parts,
            state,
            Role::can_write,
            "Accountant or admin role required",
        )
        .await
        .map(RequireWriter)
    }
}
