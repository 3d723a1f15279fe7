//! Handlers for the `/clients` resource.

use axum::extract::State;
use axum::http::StatusCode;
use tally_core::error::CoreError;
use tally_core::types::DbId;
use tally_db::models::client::{ClientResponse, CreateClient, UpdateClient};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::extract::{Json, Path, Query};
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireAdmin;
use crate::query::IncludeDeletedParams;
use crate::response::DataResponse;
use crate::state::AppState;

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Client",
        id,
    })
}

/// GET /api/v1/clients?include_deleted=
pub async fn list(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<IncludeDeletedParams>,
) -> AppResult<Json<DataResponse<Vec<ClientResponse>>>> {
    let clients = state.storage.list_clients(params.include_deleted).await?;
    Ok(Json(DataResponse::new(
        clients.into_iter().map(ClientResponse::from).collect(),
    )))
}

/// POST /api/v1/clients
pub async fn create(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateClient>,
) -> AppResult<(StatusCode, Json<DataResponse<ClientResponse>>)> {
    input.validate()?;
    let client = state.storage.create_client(&input).await?;
    tracing::info!(client_id = client.id, code = %client.code, "Client created");
    Ok((StatusCode::CREATED, Json(DataResponse::new(client.into()))))
}

/// GET /api/v1/clients/{id}
///
/// Soft-deleted clients are still returned so their status can be shown.
pub async fn get_by_id(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ClientResponse>>> {
    let client = state
        .storage
        .find_client(id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse::new(client.into())))
}

/// PUT /api/v1/clients/{id}
pub async fn update(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateClient>,
) -> AppResult<Json<DataResponse<ClientResponse>>> {
    input.validate()?;
    let client = state
        .storage
        .update_client(id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse::new(client.into())))
}

/// DELETE /api/v1/clients/{id}
pub async fn delete(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if state.storage.soft_delete_client(id).await? {
        tracing::info!(client_id = id, "Client soft-deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}

/// POST /api/v1/clients/{id}/restore
pub async fn restore(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<ClientResponse>>> {
    if !state.storage.restore_client(id).await? {
        return Err(not_found(id));
    }
    let client = state
        .storage
        .find_client(id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse::new(client.into())))
}
