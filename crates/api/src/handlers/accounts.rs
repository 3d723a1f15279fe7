//! Handlers for the per-client chart of accounts.

use axum::extract::State;
use axum::http::StatusCode;
use tally_core::chart::{build_tree, AccountTreeNode};
use tally_core::error::CoreError;
use tally_core::types::DbId;
use tally_db::models::account::{Account, CreateAccount, UpdateAccount};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::extract::{Json, Path, Query};
use crate::handlers::scope::live_client;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireWriter;
use crate::query::IncludeInactiveParams;
use crate::response::DataResponse;
use crate::state::AppState;

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Account",
        id,
    })
}

/// GET /api/v1/clients/{client_id}/accounts?include_inactive=
pub async fn list(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(client_id): Path<DbId>,
    Query(params): Query<IncludeInactiveParams>,
) -> AppResult<Json<DataResponse<Vec<Account>>>> {
    live_client(&state, client_id).await?;
    let accounts = state
        .storage
        .list_accounts(client_id, params.include_inactive)
        .await?;
    Ok(Json(DataResponse::new(accounts)))
}

/// GET /api/v1/clients/{client_id}/accounts/tree
///
/// The full chart including inactive accounts, so inactive parents keep
/// their children attached.
pub async fn tree(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(client_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<AccountTreeNode<Account>>>>> {
    live_client(&state, client_id).await?;
    let accounts = state.storage.list_accounts(client_id, true).await?;
    Ok(Json(DataResponse::new(build_tree(accounts))))
}

/// POST /api/v1/clients/{client_id}/accounts
pub async fn create(
    RequireWriter(_user): RequireWriter,
    State(state): State<AppState>,
    Path(client_id): Path<DbId>,
    Json(input): Json<CreateAccount>,
) -> AppResult<(StatusCode, Json<DataResponse<Account>>)> {
    input.validate()?;
    live_client(&state, client_id).await?;
    let account = state.storage.create_account(client_id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(account))))
}

/// GET /api/v1/clients/{client_id}/accounts/{id}
pub async fn get_by_id(
    _user: AuthUser,
    State(state): State<AppState>,
    Path((client_id, id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<Account>>> {
    live_client(&state, client_id).await?;
    let account = state
        .storage
        .find_account(client_id, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse::new(account)))
}

/// PUT /api/v1/clients/{client_id}/accounts/{id}
pub async fn update(
    RequireWriter(_user): RequireWriter,
    State(state): State<AppState>,
    Path((client_id, id)): Path<(DbId, DbId)>,
    Json(input): Json<UpdateAccount>,
) -> AppResult<Json<DataResponse<Account>>> {
    input.validate()?;
    live_client(&state, client_id).await?;
    let account = state
        .storage
        .update_account(client_id, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse::new(account)))
}

/// DELETE /api/v1/clients/{client_id}/accounts/{id}
///
/// Accounts are deactivated, never removed; posted lines keep referencing them.
pub async fn deactivate(
    RequireWriter(_user): RequireWriter,
    State(state): State<AppState>,
    Path((client_id, id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    live_client(&state, client_id).await?;
    if state.storage.deactivate_account(client_id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}
