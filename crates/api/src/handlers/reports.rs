//! Report handlers: trial balance and the flat journal line export.

use axum::extract::State;
use tally_core::filters::JournalFilterParams;
use tally_core::types::DbId;
use tally_db::models::report::{AccountBalance, JournalLineExport};

use crate::error::AppResult;
use crate::extract::{Json, Path, Query};
use crate::handlers::scope::{client_entity, live_client};
use crate::middleware::auth::AuthUser;
use crate::query::EntityScopeParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// GET /api/v1/clients/{client_id}/reports/trial-balance?entity_id=
///
/// Per-account totals over posted entries only.
pub async fn trial_balance(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(client_id): Path<DbId>,
    Query(params): Query<EntityScopeParams>,
) -> AppResult<Json<DataResponse<Vec<AccountBalance>>>> {
    match params.entity_id {
        Some(entity_id) => {
            client_entity(&state, client_id, entity_id).await?;
        }
        None => {
            live_client(&state, client_id).await?;
        }
    }
    let balances = state
        .storage
        .trial_balance(client_id, params.entity_id)
        .await?;
    Ok(Json(DataResponse::new(balances)))
}

/// GET /api/v1/clients/{client_id}/reports/journal-lines?entity_id=&status=&from=&to=&search=
///
/// One row per line with its entry header, ignoring paging.
pub async fn journal_lines(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(client_id): Path<DbId>,
    Query(params): Query<JournalFilterParams>,
) -> AppResult<Json<DataResponse<Vec<JournalLineExport>>>> {
    live_client(&state, client_id).await?;
    let filter = params.parse()?;
    let rows = state.storage.export_journal_lines(client_id, &filter).await?;
    Ok(Json(DataResponse::new(rows)))
}
