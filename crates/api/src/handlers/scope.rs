//! Lookups shared by the nested client routes.

use tally_core::error::CoreError;
use tally_core::types::DbId;
use tally_db::models::client::Client;
use tally_db::models::entity::Entity;
use tally_db::models::journal_entry::{EntryRef, JournalEntryWithLines};

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// The client addressed by a nested route. Soft-deleted clients are hidden.
pub async fn live_client(state: &AppState, client_id: DbId) -> AppResult<Client> {
    state
        .storage
        .find_client(client_id)
        .await?
        .filter(|c| !c.is_deleted())
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Client",
            id: client_id,
        }))
}

/// A non-deleted entity of a live client.
pub async fn client_entity(state: &AppState, client_id: DbId, entity_id: DbId) -> AppResult<Entity> {
    live_client(state, client_id).await?;
    state
        .storage
        .find_entity(client_id, entity_id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Entity",
            id: entity_id,
        }))
}

/// A journal entry with its lines, addressed through client and entity.
pub async fn journal_entry(state: &AppState, entry: EntryRef) -> AppResult<JournalEntryWithLines> {
    client_entity(state, entry.client_id, entry.entity_id).await?;
    state
        .storage
        .find_journal_entry(entry)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "JournalEntry",
            id: entry.id,
        }))
}
