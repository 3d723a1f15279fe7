//! Handlers for `/clients/{client_id}/entities`.

use axum::extract::State;
use axum::http::StatusCode;
use tally_core::error::CoreError;
use tally_core::types::DbId;
use tally_db::models::entity::{CreateEntity, Entity, UpdateEntity};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::extract::{Json, Path, Query};
use crate::handlers::scope::live_client;
use crate::middleware::auth::AuthUser;
use crate::middleware::rbac::RequireWriter;
use crate::query::{IncludeInactiveParams, SelectableParams};
use crate::response::DataResponse;
use crate::state::AppState;

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Entity",
        id,
    })
}

/// GET /api/v1/clients/{client_id}/entities?include_inactive=
pub async fn list(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(client_id): Path<DbId>,
    Query(params): Query<IncludeInactiveParams>,
) -> AppResult<Json<DataResponse<Vec<Entity>>>> {
    live_client(&state, client_id).await?;
    let entities = state
        .storage
        .list_entities(client_id, params.include_inactive)
        .await?;
    Ok(Json(DataResponse::new(entities)))
}

/// GET /api/v1/clients/{client_id}/entities/selectable?selected_id=
///
/// Active entities plus the current selection if it has been deactivated.
pub async fn selectable(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(client_id): Path<DbId>,
    Query(params): Query<SelectableParams>,
) -> AppResult<Json<DataResponse<Vec<Entity>>>> {
    live_client(&state, client_id).await?;
    let entities = state
        .storage
        .list_selectable_entities(client_id, params.selected_id)
        .await?;
    Ok(Json(DataResponse::new(entities)))
}

/// POST /api/v1/clients/{client_id}/entities
pub async fn create(
    RequireWriter(_user): RequireWriter,
    State(state): State<AppState>,
    Path(client_id): Path<DbId>,
    Json(input): Json<CreateEntity>,
) -> AppResult<(StatusCode, Json<DataResponse<Entity>>)> {
    input.validate()?;
    live_client(&state, client_id).await?;
    let entity = state.storage.create_entity(client_id, &input).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(entity))))
}

/// GET /api/v1/clients/{client_id}/entities/{id}
pub async fn get_by_id(
    _user: AuthUser,
    State(state): State<AppState>,
    Path((client_id, id)): Path<(DbId, DbId)>,
) -> AppResult<Json<DataResponse<Entity>>> {
    live_client(&state, client_id).await?;
    let entity = state
        .storage
        .find_entity(client_id, id)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse::new(entity)))
}

/// PUT /api/v1/clients/{client_id}/entities/{id}
pub async fn update(
    RequireWriter(_user): RequireWriter,
    State(state): State<AppState>,
    Path((client_id, id)): Path<(DbId, DbId)>,
    Json(input): Json<UpdateEntity>,
) -> AppResult<Json<DataResponse<Entity>>> {
    input.validate()?;
    live_client(&state, client_id).await?;
    let entity = state
        .storage
        .update_entity(client_id, id, &input)
        .await?
        .ok_or_else(|| not_found(id))?;
    Ok(Json(DataResponse::new(entity)))
}

/// DELETE /api/v1/clients/{client_id}/entities/{id}
pub async fn delete(
    RequireWriter(_user): RequireWriter,
    State(state): State<AppState>,
    Path((client_id, id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    live_client(&state, client_id).await?;
    if state.storage.soft_delete_entity(client_id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found(id))
    }
}
