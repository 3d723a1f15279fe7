//! Repository for the `attachments` table.
//!
//! Rows owned by an entry are only inserted, removed or re-parented while
//! that entry is locked and still a draft.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tally_core::attachment::{AttachmentOwner, StagingKey};
use tally_core::journal::ensure_attachments_mutable;
use tally_core::types::{DbId, Timestamp};

use crate::error::{StoreError, StoreResult};
use crate::models::attachment::{Attachment, NewAttachment};
use crate::repositories::journal_entry_repo::lock_entry;
use crate::stores::AttachmentStore;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, client_id, journal_entry_id, staging_key, file_name, content_type, \
                        size_bytes, storage_key, uploaded_by, created_at";

pub struct AttachmentRepo {
    pool: PgPool,
}

impl AttachmentRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Delete every attachment row of an entry, returning the removed rows.
pub(crate) async fn delete_for_entry(
    conn: &mut PgConnection,
    journal_entry_id: DbId,
) -> StoreResult<Vec<Attachment>> {
    let query = format!(
        "DELETE FROM attachments WHERE journal_entry_id = $1 RETURNING {COLUMNS}"
    );
    let removed = sqlx::query_as::<_, Attachment>(&query)
        .bind(journal_entry_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(removed)
}

#[async_trait]
impl AttachmentStore for AttachmentRepo {
    async fn create_attachment(&self, input: &NewAttachment) -> StoreResult<Attachment> {
        let mut tx = self.pool.begin().await?;
        if let AttachmentOwner::Entry(entry_id) = input.owner {
            let entry = lock_entry(&mut tx, input.client_id, None, entry_id).await?;
            ensure_attachments_mutable(entry.status)?;
        }

        let query = format!(
            "INSERT INTO attachments
                (client_id, journal_entry_id, staging_key, file_name, content_type,
                 size_bytes, storage_key, uploaded_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        let attachment = sqlx::query_as::<_, Attachment>(&query)
            .bind(input.client_id)
            .bind(input.journal_entry_id())
            .bind(input.staging_key())
            .bind(&input.file_name)
            .bind(&input.content_type)
            .bind(input.size_bytes)
            .bind(&input.storage_key)
            .bind(input.uploaded_by)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(attachment)
    }

    async fn find_attachment(&self, client_id: DbId, id: DbId) -> StoreResult<Option<Attachment>> {
        let query = format!("SELECT {COLUMNS} FROM attachments WHERE id = $1 AND client_id = $2");
        let attachment = sqlx::query_as::<_, Attachment>(&query)
            .bind(id)
            .bind(client_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(attachment)
    }

    async fn list_entry_attachments(
        &self,
        client_id: DbId,
        journal_entry_id: DbId,
    ) -> StoreResult<Vec<Attachment>> {
        let query = format!(
            "SELECT {COLUMNS} FROM attachments
             WHERE client_id = $1 AND journal_entry_id = $2
             ORDER BY created_at, id"
        );
        let attachments = sqlx::query_as::<_, Attachment>(&query)
            .bind(client_id)
            .bind(journal_entry_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(attachments)
    }

    async fn list_staged_attachments(
        &self,
        client_id: DbId,
        staging_key: StagingKey,
    ) -> StoreResult<Vec<Attachment>> {
        let query = format!(
            "SELECT {COLUMNS} FROM attachments
             WHERE client_id = $1 AND staging_key = $2
             ORDER BY created_at, id"
        );
        let attachments = sqlx::query_as::<_, Attachment>(&query)
            .bind(client_id)
            .bind(staging_key.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        Ok(attachments)
    }

    async fn delete_attachment(
        &self,
        client_id: DbId,
        id: DbId,
    ) -> StoreResult<Option<Attachment>> {
        let mut tx = self.pool.begin().await?;

        // Lock order is entry row, then attachment row, as in entry deletion.
        let Some(owner) = sqlx::query_scalar::<_, Option<DbId>>(
            "SELECT journal_entry_id FROM attachments WHERE id = $1 AND client_id = $2",
        )
        .bind(id)
        .bind(client_id)
        .fetch_optional(&mut *tx)
        .await?
        else {
            return Ok(None);
        };
        if let Some(entry_id) = owner {
            let entry = lock_entry(&mut tx, client_id, None, entry_id).await?;
            ensure_attachments_mutable(entry.status)?;
        }

        let query = format!(
            "SELECT {COLUMNS} FROM attachments WHERE id = $1 AND client_id = $2 FOR UPDATE"
        );
        let Some(attachment) = sqlx::query_as::<_, Attachment>(&query)
            .bind(id)
            .bind(client_id)
            .fetch_optional(&mut *tx)
            .await?
        else {
            return Ok(None);
        };
        if attachment.journal_entry_id != owner {
            return Err(StoreError::conflict(
                "Attachment was moved to a journal entry while being deleted; try again",
            ));
        }

        sqlx::query("DELETE FROM attachments WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(Some(attachment))
    }

    async fn promote_staged_attachments(
        &self,
        client_id: DbId,
        staging_key: StagingKey,
        journal_entry_id: DbId,
    ) -> StoreResult<Vec<Attachment>> {
        let mut tx = self.pool.begin().await?;
        let entry = lock_entry(&mut tx, client_id, None, journal_entry_id).await?;
        ensure_attachments_mutable(entry.status)?;

        let query = format!(
            "UPDATE attachments SET journal_entry_id = $3, staging_key = NULL
             WHERE client_id = $1 AND staging_key = $2
             RETURNING {COLUMNS}"
        );
        let promoted = sqlx::query_as::<_, Attachment>(&query)
            .bind(client_id)
            .bind(staging_key.as_uuid())
            .bind(journal_entry_id)
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::debug!(
            journal_entry_id,
            %staging_key,
            count = promoted.len(),
            "Promoted staged attachments"
        );
        Ok(promoted)
    }

    async fn purge_staged_attachments(&self, cutoff: Timestamp) -> StoreResult<Vec<Attachment>> {
        let query = format!(
            "DELETE FROM attachments
             WHERE staging_key IS NOT NULL AND created_at < $1
             RETURNING {COLUMNS}"
        );
        let purged = sqlx::query_as::<_, Attachment>(&query)
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await?;
        Ok(purged)
    }
}
