//! Attachment handlers for journal entries and staged uploads.
//!
//! Uploads for an entry that does not exist yet go to a client-scoped
//! staging key and are moved onto the entry with an explicit promote call
//! once it has been saved.

use axum::extract::{Multipart, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use serde::Deserialize;
use tally_core::attachment::{
    new_storage_key, sanitize_file_name, validate_content_type, validate_size, AttachmentOwner,
    StagingKey,
};
use tally_core::capabilities::{capabilities, creation_capabilities, require, ViewContext};
use tally_core::error::CoreError;
use tally_core::journal::ensure_attachments_mutable;
use tally_core::types::DbId;
use tally_db::models::attachment::{Attachment, NewAttachment};
use tally_db::models::journal_entry::EntryRef;

use crate::error::{AppError, AppResult};
use crate::extract::{Json, Path};
use crate::handlers::scope::{journal_entry, live_client};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST .../files/promote`.
#[derive(Debug, Deserialize)]
pub struct PromoteRequest {
    pub staging_key: StagingKey,
}

struct Upload {
    file_name: String,
    content_type: String,
    bytes: Vec<u8>,
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Attachment",
        id,
    })
}

fn parse_staging_key(raw: &str) -> AppResult<StagingKey> {
    Ok(raw.parse::<StagingKey>()?)
}

/// Read the single `file` field of a multipart form and check it against the
/// limits.
async fn read_upload(mut multipart: Multipart, max_bytes: u64) -> AppResult<Upload> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        if upload.is_some() {
            return Err(AppError::BadRequest(
                "Only one 'file' field is accepted per upload".into(),
            ));
        }
        let file_name = sanitize_file_name(field.file_name().unwrap_or(""))?;
        let content_type =
            validate_content_type(field.content_type().unwrap_or("application/octet-stream"))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        upload = Some(Upload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    let upload =
        upload.ok_or_else(|| AppError::BadRequest("Missing required 'file' field".into()))?;
    validate_size(upload.bytes.len() as u64, max_bytes)?;
    Ok(upload)
}

/// Write content, then metadata. Content is removed again if the metadata
/// insert is rejected.
async fn store_upload(
    state: &AppState,
    client_id: DbId,
    owner: AttachmentOwner,
    user: AuthUser,
    upload: Upload,
) -> AppResult<Attachment> {
    let storage_key = new_storage_key(client_id);
    let size_bytes = upload.bytes.len() as i64;
    state.storage.put_file(&storage_key, upload.bytes).await?;

    let created = state
        .storage
        .create_attachment(&NewAttachment {
            client_id,
            owner,
            file_name: upload.file_name,
            content_type: upload.content_type,
            size_bytes,
            storage_key: storage_key.clone(),
            uploaded_by: user.user_id,
        })
        .await;

    match created {
        Ok(attachment) => {
            tracing::info!(
                attachment_id = attachment.id,
                client_id,
                size_bytes,
                "Attachment uploaded"
            );
            Ok(attachment)
        }
        Err(e) => {
            if let Err(cleanup) = state.storage.delete_file(&storage_key).await {
                tracing::warn!(storage_key, error = %cleanup, "Failed to remove orphaned upload");
            }
            Err(e.into())
        }
    }
}

/// Content is removed after its metadata row, so failures only leave an
/// unreferenced file behind.
async fn remove_content(state: &AppState, attachment: &Attachment) {
    if let Err(e) = state.storage.delete_file(&attachment.storage_key).await {
        tracing::warn!(
            attachment_id = attachment.id,
            error = %e,
            "Failed to remove attachment content"
        );
    }
}

/// Check that `user` may change the attachments of `entry` right now.
async fn authorize_attachment_change(
    state: &AppState,
    user: AuthUser,
    entry: EntryRef,
) -> AppResult<()> {
    let current = journal_entry(state, entry).await?;
    let status = current.entry.status;
    let caps = capabilities(status, user.role, ViewContext::Edit);
    require(
        caps.can_manage_attachments,
        user.role.can_write(),
        "manage attachments",
        || ensure_attachments_mutable(status),
    )?;
    Ok(())
}

/// GET /api/v1/clients/{client_id}/entities/{entity_id}/journal-entries/{id}/files
pub async fn list_for_entry(
    _user: AuthUser,
    State(state): State<AppState>,
    Path((client_id, entity_id, id)): Path<(DbId, DbId, DbId)>,
) -> AppResult<Json<DataResponse<Vec<Attachment>>>> {
    journal_entry(
        &state,
        EntryRef {
            client_id,
            entity_id,
            id,
        },
    )
    .await?;
    let attachments = state.storage.list_entry_attachments(client_id, id).await?;
    Ok(Json(DataResponse::new(attachments)))
}

/// POST /api/v1/clients/{client_id}/entities/{entity_id}/journal-entries/{id}/files
///
/// Multipart form with a required `file` field.
pub async fn upload_for_entry(
    user: AuthUser,
    State(state): State<AppState>,
    Path((client_id, entity_id, id)): Path<(DbId, DbId, DbId)>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<Attachment>>)> {
    let entry = EntryRef {
        client_id,
        entity_id,
        id,
    };
    authorize_attachment_change(&state, user, entry).await?;
    let upload = read_upload(multipart, state.config.max_upload_bytes).await?;
    let attachment = store_upload(&state, client_id, AttachmentOwner::Entry(id), user, upload).await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(attachment))))
}

/// POST /api/v1/clients/{client_id}/entities/{entity_id}/journal-entries/{id}/files/promote
///
/// Moves every upload staged under `staging_key` onto this entry and returns
/// the entry's full attachment list.
pub async fn promote(
    user: AuthUser,
    State(state): State<AppState>,
    Path((client_id, entity_id, id)): Path<(DbId, DbId, DbId)>,
    Json(input): Json<PromoteRequest>,
) -> AppResult<Json<DataResponse<Vec<Attachment>>>> {
    let entry = EntryRef {
        client_id,
        entity_id,
        id,
    };
    authorize_attachment_change(&state, user, entry).await?;
    let promoted = state
        .storage
        .promote_staged_attachments(client_id, input.staging_key, id)
        .await?;
    tracing::info!(
        journal_entry_id = id,
        staging_key = %input.staging_key,
        promoted = promoted.len(),
        "Staged attachments promoted"
    );
    let attachments = state.storage.list_entry_attachments(client_id, id).await?;
    Ok(Json(DataResponse::new(attachments)))
}

/// GET /api/v1/clients/{client_id}/entities/{entity_id}/journal-entries/{id}/files/{file_id}/content
pub async fn download(
    _user: AuthUser,
    State(state): State<AppState>,
    Path((client_id, entity_id, id, file_id)): Path<(DbId, DbId, DbId, DbId)>,
) -> AppResult<impl IntoResponse> {
    journal_entry(
        &state,
        EntryRef {
            client_id,
            entity_id,
            id,
        },
    )
    .await?;
    let attachment = state
        .storage
        .find_attachment(client_id, file_id)
        .await?
        .filter(|a| a.journal_entry_id == Some(id))
        .ok_or_else(|| not_found(file_id))?;
    let bytes = state
        .storage
        .read_file(&attachment.storage_key)
        .await?
        .ok_or_else(|| {
            AppError::InternalError(format!(
                "Content missing for attachment {}",
                attachment.id
            ))
        })?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, attachment.content_type.clone()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", attachment.file_name),
            ),
        ],
        bytes,
    ))
}

/// DELETE /api/v1/clients/{client_id}/entities/{entity_id}/journal-entries/{id}/files/{file_id}
pub async fn delete_for_entry(
    user: AuthUser,
    State(state): State<AppState>,
    Path((client_id, entity_id, id, file_id)): Path<(DbId, DbId, DbId, DbId)>,
) -> AppResult<StatusCode> {
    let entry = EntryRef {
        client_id,
        entity_id,
        id,
    };
    authorize_attachment_change(&state, user, entry).await?;
    state
        .storage
        .find_attachment(client_id, file_id)
        .await?
        .filter(|a| a.journal_entry_id == Some(id))
        .ok_or_else(|| not_found(file_id))?;

    let removed = state
        .storage
        .delete_attachment(client_id, file_id)
        .await?
        .ok_or_else(|| not_found(file_id))?;
    remove_content(&state, &removed).await;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/clients/{client_id}/staged-files/{staging_key}
pub async fn list_staged(
    _user: AuthUser,
    State(state): State<AppState>,
    Path((client_id, staging_key)): Path<(DbId, String)>,
) -> AppResult<Json<DataResponse<Vec<Attachment>>>> {
    let staging_key = parse_staging_key(&staging_key)?;
    live_client(&state, client_id).await?;
    let attachments = state
        .storage
        .list_staged_attachments(client_id, staging_key)
        .await?;
    Ok(Json(DataResponse::new(attachments)))
}

/// POST /api/v1/clients/{client_id}/staged-files/{staging_key}
///
/// Multipart form with a required `file` field.
pub async fn upload_staged(
    user: AuthUser,
    State(state): State<AppState>,
    Path((client_id, staging_key)): Path<(DbId, String)>,
    multipart: Multipart,
) -> AppResult<(StatusCode, Json<DataResponse<Attachment>>)> {
    let staging_key = parse_staging_key(&staging_key)?;
    require(
        creation_capabilities(user.role).can_manage_attachments,
        user.role.can_write(),
        "manage attachments",
        || Ok(()),
    )?;
    live_client(&state, client_id).await?;
    let upload = read_upload(multipart, state.config.max_upload_bytes).await?;
    let attachment = store_upload(
        &state,
        client_id,
        AttachmentOwner::Staged(staging_key),
        user,
        upload,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(DataResponse::new(attachment))))
}

/// DELETE /api/v1/clients/{client_id}/staged-files/{staging_key}/{file_id}
pub async fn delete_staged(
    user: AuthUser,
    State(state): State<AppState>,
    Path((client_id, staging_key, file_id)): Path<(DbId, String, DbId)>,
) -> AppResult<StatusCode> {
    let staging_key = parse_staging_key(&staging_key)?;
    require(
        creation_capabilities(user.role).can_manage_attachments,
        user.role.can_write(),
        "manage attachments",
        || Ok(()),
    )?;
    live_client(&state, client_id).await?;
    state
        .storage
        .find_attachment(client_id, file_id)
        .await?
        .filter(|a| a.staging_key == Some(staging_key.as_uuid()))
        .ok_or_else(|| not_found(file_id))?;

    let removed = state
        .storage
        .delete_attachment(client_id, file_id)
        .await?
        .ok_or_else(|| not_found(file_id))?;
    remove_content(&state, &removed).await;
    Ok(StatusCode::NO_CONTENT)
}
