//! Periodic removal of staged uploads that were never promoted.
//!
//! Uploads made while composing an entry hang off a staging key until the
//! caller promotes them. Abandoned compositions leave them behind; this job
//! deletes their metadata and content once they are older than the TTL.

use std::time::Duration;

use chrono::Utc;
use tally_db::{Storage, StoreResult};
use tokio_util::sync::CancellationToken;

/// How often the cleanup job runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Purge staged uploads older than `ttl_hours`. Returns how many were removed.
pub async fn purge_once(storage: &Storage, ttl_hours: i64) -> StoreResult<usize> {
    let cutoff = Utc::now() - chrono::Duration::hours(ttl_hours);
    let purged = storage.purge_staged_attachments(cutoff).await?;

    for attachment in &purged {
        if let Err(e) = storage.delete_file(&attachment.storage_key).await {
            tracing::warn!(
                attachment_id = attachment.id,
                error = %e,
                "Staged cleanup: failed to remove content"
            );
        }
    }
    Ok(purged.len())
}

/// Run the staged upload cleanup loop until `cancel` is triggered.
pub async fn run(storage: Storage, ttl_hours: i64, cancel: CancellationToken) {
    tracing::info!(
        ttl_hours,
        interval_secs = CLEANUP_INTERVAL.as_secs(),
        "Staged upload cleanup job started"
    );

    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Staged upload cleanup job stopping");
                break;
            }
            _ = interval.tick() => {
                match purge_once(&storage, ttl_hours).await {
                    Ok(0) => tracing::debug!("Staged cleanup: nothing to purge"),
                    Ok(purged) => tracing::info!(purged, "Staged cleanup: purged stale uploads"),
                    Err(e) => tracing::error!(error = %e, "Staged cleanup: purge failed"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use tally_core::attachment::{AttachmentOwner, StagingKey};
    use tally_db::models::attachment::NewAttachment;
    use tally_db::models::client::CreateClient;
    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn purge_respects_ttl_and_removes_content() {
        let storage = Storage::in_memory();
        let client = storage
            .create_client(&CreateClient {
                name: "Acme".into(),
                code: "ACME".into(),
                is_active: None,
            })
            .await
            .unwrap();
        storage.put_file("k1", b"receipt".to_vec()).await.unwrap();
        storage
            .create_attachment(&NewAttachment {
                client_id: client.id,
                owner: AttachmentOwner::Staged(StagingKey(Uuid::new_v4())),
                file_name: "receipt.pdf".into(),
                content_type: "application/pdf".into(),
                size_bytes: 7,
                storage_key: "k1".into(),
                uploaded_by: 1,
            })
            .await
            .unwrap();

        // A fresh upload survives a one-hour TTL.
        assert_eq!(purge_once(&storage, 1).await.unwrap(), 0);
        assert!(storage.read_file("k1").await.unwrap().is_some());

        // A negative TTL puts the cutoff in the future, so everything is stale.
        assert_eq!(purge_once(&storage, -1).await.unwrap(), 1);
        assert!(storage.read_file("k1").await.unwrap().is_none());
    }
}
