use async_trait::async_trait;
use chrono::Utc;
use tally_core::attachment::{AttachmentOwner, StagingKey};
use tally_core::journal::ensure_attachments_mutable;
use tally_core::types::{DbId, Timestamp};

use super::MemoryStore;
use crate::error::StoreResult;
use crate::models::attachment::{Attachment, NewAttachment};
use crate::stores::AttachmentStore;

fn sorted(mut attachments: Vec<Attachment>) -> Vec<Attachment> {
    attachments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    attachments
}

#[async_trait]
impl AttachmentStore for MemoryStore {
    async fn create_attachment(&self, input: &NewAttachment) -> StoreResult<Attachment> {
        let mut t = self.tables.write().await;
        if let AttachmentOwner::Entry(entry_id) = input.owner {
            ensure_attachments_mutable(t.entry_status(input.client_id, entry_id)?)?;
        }
        let attachment = Attachment {
            id: t.next_id(),
            client_id: input.client_id,
            journal_entry_id: input.journal_entry_id(),
            staging_key: input.staging_key(),
            file_name: input.file_name.clone(),
            content_type: input.content_type.clone(),
            size_bytes: input.size_bytes,
            storage_key: input.storage_key.clone(),
            uploaded_by: input.uploaded_by,
            created_at: Utc::now(),
        };
        t.attachments.insert(attachment.id, attachment.clone());
        Ok(attachment)
    }

    async fn find_attachment(&self, client_id: DbId, id: DbId) -> StoreResult<Option<Attachment>> {
        let t = self.tables.read().await;
        Ok(t.attachments
            .get(&id)
            .filter(|a| a.client_id == client_id)
            .cloned())
    }

    async fn list_entry_attachments(
        &self,
        client_id: DbId,
        journal_entry_id: DbId,
    ) -> StoreResult<Vec<Attachment>> {
        let t = self.tables.read().await;
        Ok(sorted(
            t.attachments
                .values()
                .filter(|a| {
                    a.client_id == client_id && a.journal_entry_id == Some(journal_entry_id)
                })
                .cloned()
                .collect(),
        ))
    }

    async fn list_staged_attachments(
        &self,
        client_id: DbId,
        staging_key: StagingKey,
    ) -> StoreResult<Vec<Attachment>> {
        let t = self.tables.read().await;
        Ok(sorted(
            t.attachments
                .values()
                .filter(|a| {
                    a.client_id == client_id && a.staging_key == Some(staging_key.as_uuid())
                })
                .cloned()
                .collect(),
        ))
    }

    async fn delete_attachment(
        &self,
        client_id: DbId,
        id: DbId,
    ) -> StoreResult<Option<Attachment>> {
        let mut t = self.tables.write().await;
        let Some(attachment) = t
            .attachments
            .get(&id)
            .filter(|a| a.client_id == client_id)
            .cloned()
        else {
            return Ok(None);
        };
        if let Some(entry_id) = attachment.journal_entry_id {
            ensure_attachments_mutable(t.entry_status(client_id, entry_id)?)?;
        }
        t.attachments.remove(&id);
        Ok(Some(attachment))
    }

    async fn promote_staged_attachments(
        &self,
        client_id: DbId,
        staging_key: StagingKey,
        journal_entry_id: DbId,
    ) -> StoreResult<Vec<Attachment>> {
        let mut t = self.tables.write().await;
        ensure_attachments_mutable(t.entry_status(client_id, journal_entry_id)?)?;

        let mut promoted = Vec::new();
        for attachment in t.attachments.values_mut().filter(|a| {
            a.client_id == client_id && a.staging_key == Some(staging_key.as_uuid())
        }) {
            attachment.staging_key = None;
            attachment.journal_entry_id = Some(journal_entry_id);
            promoted.push(attachment.clone());
        }
        Ok(promoted)
    }

    async fn purge_staged_attachments(&self, cutoff: Timestamp) -> StoreResult<Vec<Attachment>> {
        let mut t = self.tables.write().await;
        let expired: Vec<DbId> = t
            .attachments
            .values()
            .filter(|a| a.staging_key.is_some() && a.created_at < cutoff)
            .map(|a| a.id)
            .collect();
        Ok(expired
            .into_iter()
            .filter_map(|id| t.attachments.remove(&id))
            .collect())
    }
}
