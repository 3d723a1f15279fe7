//! Handlers for `/clients/{client_id}/entities/{entity_id}/journal-entries`.
//!
//! Every mutation is authorised through [`capabilities`], the same policy
//! the detail and capabilities responses expose, then re-checked by the
//! store under a row lock.

use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;
use tally_core::capabilities::{
    capabilities, creation_capabilities, require, Capabilities, ViewContext,
};
use tally_core::error::CoreError;
use tally_core::filters::JournalFilterParams;
use tally_core::journal::{ensure_editable, validate_post, validate_void};
use tally_core::types::DbId;
use tally_db::models::journal_entry::{
    CreateJournalEntry, CreateJournalLine, EntryRef, JournalEntry, JournalEntryWithLines,
    UpdateJournalEntry, VoidJournalEntry,
};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::extract::{Json, Path, Query};
use crate::handlers::scope::{client_entity, journal_entry};
use crate::middleware::auth::AuthUser;
use crate::query::ContextParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// An entry with the controls its viewer may use in the detail view.
#[derive(Debug, Serialize)]
pub struct JournalEntryDetail {
    #[serde(flatten)]
    pub entry: JournalEntryWithLines,
    pub capabilities: Capabilities,
}

impl JournalEntryDetail {
    fn for_user(entry: JournalEntryWithLines, user: AuthUser) -> Self {
        let capabilities = capabilities(entry.entry.status, user.role, ViewContext::Detail);
        Self {
            entry,
            capabilities,
        }
    }
}

fn detail(entry: JournalEntryWithLines, user: AuthUser) -> Json<DataResponse<JournalEntryDetail>> {
    Json(DataResponse::new(JournalEntryDetail::for_user(entry, user)))
}

/// Load the entry and check that `user` may edit it.
async fn authorize_edit(
    state: &AppState,
    user: AuthUser,
    entry: EntryRef,
) -> AppResult<JournalEntryWithLines> {
    let current = journal_entry(state, entry).await?;
    let status = current.entry.status;
    let caps = capabilities(status, user.role, ViewContext::Edit);
    require(caps.can_edit, user.role.can_write(), "edit journal entries", || {
        ensure_editable(status)
    })?;
    Ok(current)
}

/// GET /api/v1/clients/{client_id}/entities/{entity_id}/journal-entries
pub async fn list(
    _user: AuthUser,
    State(state): State<AppState>,
    Path((client_id, entity_id)): Path<(DbId, DbId)>,
    Query(params): Query<JournalFilterParams>,
) -> AppResult<Json<DataResponse<Vec<JournalEntry>>>> {
    client_entity(&state, client_id, entity_id).await?;
    let mut filter = params.parse()?;
    filter.entity_id = Some(entity_id);
    let entries = state.storage.list_journal_entries(client_id, &filter).await?;
    Ok(Json(DataResponse::new(entries)))
}

/// POST /api/v1/clients/{client_id}/entities/{entity_id}/journal-entries
///
/// Entries are always created as drafts; posting is a separate action.
pub async fn create(
    user: AuthUser,
    State(state): State<AppState>,
    Path((client_id, entity_id)): Path<(DbId, DbId)>,
    Json(input): Json<CreateJournalEntry>,
) -> AppResult<(StatusCode, Json<DataResponse<JournalEntryDetail>>)> {
    require(
        creation_capabilities(user.role).can_edit,
        user.role.can_write(),
        "create journal entries",
        || Ok(()),
    )?;
    input.validate()?;

    let entity = client_entity(&state, client_id, entity_id).await?;
    if !entity.is_active {
        return Err(AppError::Core(CoreError::Validation(format!(
            "Entity '{}' is inactive; journal entries cannot be added to it",
            entity.code
        ))));
    }

    let created = state
        .storage
        .create_journal_entry(client_id, entity_id, user.user_id, &input)
        .await?;
    tracing::info!(
        journal_entry_id = created.entry.id,
        client_id,
        entity_id,
        lines = created.lines.len(),
        "Journal entry created"
    );
    Ok((StatusCode::CREATED, detail(created, user)))
}

/// GET /api/v1/clients/{client_id}/entities/{entity_id}/journal-entries/{id}
pub async fn get_by_id(
    user: AuthUser,
    State(state): State<AppState>,
    Path((client_id, entity_id, id)): Path<(DbId, DbId, DbId)>,
) -> AppResult<Json<DataResponse<JournalEntryDetail>>> {
    let entry = journal_entry(
        &state,
        EntryRef {
            client_id,
            entity_id,
            id,
        },
    )
    .await?;
    Ok(detail(entry, user))
}

/// GET /api/v1/clients/{client_id}/entities/{entity_id}/journal-entries/{id}/capabilities?context=
pub async fn get_capabilities(
    user: AuthUser,
    State(state): State<AppState>,
    Path((client_id, entity_id, id)): Path<(DbId, DbId, DbId)>,
    Query(params): Query<ContextParams>,
) -> AppResult<Json<DataResponse<Capabilities>>> {
    let entry = journal_entry(
        &state,
        EntryRef {
            client_id,
            entity_id,
            id,
        },
    )
    .await?;
    Ok(Json(DataResponse::new(capabilities(
        entry.entry.status,
        user.role,
        params.context,
    ))))
}

/// PUT /api/v1/clients/{client_id}/entities/{entity_id}/journal-entries/{id}
pub async fn update(
    user: AuthUser,
    State(state): State<AppState>,
    Path((client_id, entity_id, id)): Path<(DbId, DbId, DbId)>,
    Json(input): Json<UpdateJournalEntry>,
) -> AppResult<Json<DataResponse<JournalEntryDetail>>> {
    input.validate()?;
    let entry = EntryRef {
        client_id,
        entity_id,
        id,
    };
    authorize_edit(&state, user, entry).await?;
    let updated = state.storage.update_journal_entry(entry, &input).await?;
    Ok(detail(updated, user))
}

/// DELETE /api/v1/clients/{client_id}/entities/{entity_id}/journal-entries/{id}
///
/// Drafts only. Attachment content goes with the entry.
pub async fn delete(
    user: AuthUser,
    State(state): State<AppState>,
    Path((client_id, entity_id, id)): Path<(DbId, DbId, DbId)>,
) -> AppResult<StatusCode> {
    let entry = EntryRef {
        client_id,
        entity_id,
        id,
    };
    authorize_edit(&state, user, entry).await?;
    let attachments = state.storage.delete_journal_entry(entry).await?;
    for attachment in &attachments {
        if let Err(e) = state.storage.delete_file(&attachment.storage_key).await {
            tracing::warn!(
                attachment_id = attachment.id,
                error = %e,
                "Failed to remove attachment content"
            );
        }
    }
    tracing::info!(journal_entry_id = id, attachments = attachments.len(), "Draft deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/clients/{client_id}/entities/{entity_id}/journal-entries/{id}/lines
pub async fn add_line(
    user: AuthUser,
    State(state): State<AppState>,
    Path((client_id, entity_id, id)): Path<(DbId, DbId, DbId)>,
    Json(input): Json<CreateJournalLine>,
) -> AppResult<(StatusCode, Json<DataResponse<JournalEntryDetail>>)> {
    input.validate()?;
    let entry = EntryRef {
        client_id,
        entity_id,
        id,
    };
    authorize_edit(&state, user, entry).await?;
    let updated = state.storage.add_journal_line(entry, &input).await?;
    Ok((StatusCode::CREATED, detail(updated, user)))
}

/// DELETE /api/v1/clients/{client_id}/entities/{entity_id}/journal-entries/{id}/lines/{line_id}
pub async fn remove_line(
    user: AuthUser,
    State(state): State<AppState>,
    Path((client_id, entity_id, id, line_id)): Path<(DbId, DbId, DbId, DbId)>,
) -> AppResult<Json<DataResponse<JournalEntryDetail>>> {
    let entry = EntryRef {
        client_id,
        entity_id,
        id,
    };
    authorize_edit(&state, user, entry).await?;
    let updated = state.storage.remove_journal_line(entry, line_id).await?;
    Ok(detail(updated, user))
}

/// POST /api/v1/clients/{client_id}/entities/{entity_id}/journal-entries/{id}/post
pub async fn post(
    user: AuthUser,
    State(state): State<AppState>,
    Path((client_id, entity_id, id)): Path<(DbId, DbId, DbId)>,
) -> AppResult<Json<DataResponse<JournalEntryDetail>>> {
    let entry = EntryRef {
        client_id,
        entity_id,
        id,
    };
    let current = journal_entry(&state, entry).await?;
    let caps = capabilities(current.entry.status, user.role, ViewContext::Detail);
    require(caps.can_post, user.role.is_privileged(), "post journal entries", || {
        validate_post(current.entry.status, &current.totals, current.lines.len())
    })?;

    let posted = state.storage.post_journal_entry(entry, user.user_id).await?;
    tracing::info!(journal_entry_id = id, posted_by = user.user_id, "Journal entry posted");
    Ok(detail(posted, user))
}

/// POST /api/v1/clients/{client_id}/entities/{entity_id}/journal-entries/{id}/void
pub async fn void(
    user: AuthUser,
    State(state): State<AppState>,
    Path((client_id, entity_id, id)): Path<(DbId, DbId, DbId)>,
    input: Option<Json<VoidJournalEntry>>,
) -> AppResult<Json<DataResponse<JournalEntryDetail>>> {
    let input = input.map(|Json(body)| body).unwrap_or_default();
    input.validate()?;
    let entry = EntryRef {
        client_id,
        entity_id,
        id,
    };
    let current = journal_entry(&state, entry).await?;
    let status = current.entry.status;
    let caps = capabilities(status, user.role, ViewContext::Detail);
    require(caps.can_void, user.role.is_privileged(), "void journal entries", || {
        validate_void(status)
    })?;

    let voided = state
        .storage
        .void_journal_entry(entry, user.user_id, input.reason.as_deref())
        .await?;
    tracing::info!(journal_entry_id = id, voided_by = user.user_id, "Journal entry voided");
    Ok(detail(voided, user))
}
