//! Attachment metadata model.
//!
//! File content lives in a [`crate::files::FileStore`] under `storage_key`;
//! this row only records where and what it is.

use serde::Serialize;
use sqlx::FromRow;
use tally_core::attachment::AttachmentOwner;
use tally_core::types::{DbId, Timestamp};
use uuid::Uuid;

/// A row from the `attachments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Attachment {
    pub id: DbId,
    pub client_id: DbId,
    pub journal_entry_id: Option<DbId>,
    pub staging_key: Option<Uuid>,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    #[serde(skip_serializing)]
    pub storage_key: String,
    pub uploaded_by: DbId,
    pub created_at: Timestamp,
}

/// Metadata for a freshly stored upload.
#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub client_id: DbId,
    pub owner: AttachmentOwner,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_key: String,
    pub uploaded_by: DbId,
}

impl NewAttachment {
    pub fn journal_entry_id(&self) -> Option<DbId> {
        match self.owner {
            AttachmentOwner::Entry(id) => Some(id),
            AttachmentOwner::Staged(_) => None,
        }
    }

    pub fn staging_key(&self) -> Option<Uuid> {
        match self.owner {
            AttachmentOwner::Entry(_) => None,
            AttachmentOwner::Staged(key) => Some(key.as_uuid()),
        }
    }
}
