//! Narrow storage interfaces, one per domain.
//!
//! Method names are unique across traits so the [`crate::Storage`] façade
//! can forward each one under the same name.

use async_trait::async_trait;
use tally_core::attachment::StagingKey;
use tally_core::filters::JournalEntryFilter;
use tally_core::types::{DbId, Timestamp};

use crate::error::StoreResult;
use crate::models::account::{Account, CreateAccount, UpdateAccount};
use crate::models::attachment::{Attachment, NewAttachment};
use crate::models::client::{Client, CreateClient, UpdateClient};
use crate::models::entity::{CreateEntity, Entity, UpdateEntity};
use crate::models::journal_entry::{
    CreateJournalEntry, CreateJournalLine, EntryRef, JournalEntry, JournalEntryWithLines,
    UpdateJournalEntry,
};
use crate::models::report::{AccountBalance, JournalLineExport};
use crate::models::session::{CreateSession, UserSession};
use crate::models::user::{CreateUser, User};

#[async_trait]
pub trait ClientStore: Send + Sync {
    async fn create_client(&self, input: &CreateClient) -> StoreResult<Client>;
    /// Includes soft-deleted clients so their display status can be shown.
    async fn find_client(&self, id: DbId) -> StoreResult<Option<Client>>;
    async fn list_clients(&self, include_deleted: bool) -> StoreResult<Vec<Client>>;
    /// Returns `None` if the client does not exist or is soft-deleted.
    async fn update_client(&self, id: DbId, input: &UpdateClient) -> StoreResult<Option<Client>>;
    async fn soft_delete_client(&self, id: DbId) -> StoreResult<bool>;
    async fn restore_client(&self, id: DbId) -> StoreResult<bool>;
}

#[async_trait]
pub trait EntityStore: Send + Sync {
    async fn create_entity(&self, client_id: DbId, input: &CreateEntity) -> StoreResult<Entity>;
    /// Excludes soft-deleted entities.
    async fn find_entity(&self, client_id: DbId, id: DbId) -> StoreResult<Option<Entity>>;
    async fn list_entities(&self, client_id: DbId, include_inactive: bool)
        -> StoreResult<Vec<Entity>>;
    /// Entities offered for selection, keeping `selected_id` if deactivated.
    async fn list_selectable_entities(
        &self,
        client_id: DbId,
        selected_id: Option<DbId>,
    ) -> StoreResult<Vec<Entity>>;
    async fn update_entity(
        &self,
        client_id: DbId,
        id: DbId,
        input: &UpdateEntity,
    ) -> StoreResult<Option<Entity>>;
    async fn soft_delete_entity(&self, client_id: DbId, id: DbId) -> StoreResult<bool>;
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn create_account(&self, client_id: DbId, input: &CreateAccount)
        -> StoreResult<Account>;
    async fn find_account(&self, client_id: DbId, id: DbId) -> StoreResult<Option<Account>>;
    async fn list_accounts(&self, client_id: DbId, include_inactive: bool)
        -> StoreResult<Vec<Account>>;
    async fn update_account(
        &self,
        client_id: DbId,
        id: DbId,
        input: &UpdateAccount,
    ) -> StoreResult<Option<Account>>;
    async fn deactivate_account(&self, client_id: DbId, id: DbId) -> StoreResult<bool>;
}

#[async_trait]
pub trait JournalEntryStore: Send + Sync {
    /// Insert a draft entry and its lines atomically.
    async fn create_journal_entry(
        &self,
        client_id: DbId,
        entity_id: DbId,
        created_by: DbId,
        input: &CreateJournalEntry,
    ) -> StoreResult<JournalEntryWithLines>;
    async fn find_journal_entry(&self, entry: EntryRef)
        -> StoreResult<Option<JournalEntryWithLines>>;
    async fn list_journal_entries(
        &self,
        client_id: DbId,
        filter: &JournalEntryFilter,
    ) -> StoreResult<Vec<JournalEntry>>;
    async fn update_journal_entry(
        &self,
        entry: EntryRef,
        input: &UpdateJournalEntry,
    ) -> StoreResult<JournalEntryWithLines>;
    async fn add_journal_line(
        &self,
        entry: EntryRef,
        input: &CreateJournalLine,
    ) -> StoreResult<JournalEntryWithLines>;
    async fn remove_journal_line(
        &self,
        entry: EntryRef,
        line_id: DbId,
    ) -> StoreResult<JournalEntryWithLines>;
    async fn post_journal_entry(
        &self,
        entry: EntryRef,
        posted_by: DbId,
    ) -> StoreResult<JournalEntryWithLines>;
    async fn void_journal_entry(
        &self,
        entry: EntryRef,
        voided_by: DbId,
        reason: Option<&str>,
    ) -> StoreResult<JournalEntryWithLines>;
    /// Delete a draft with its lines; returns the attachments that went with it.
    async fn delete_journal_entry(&self, entry: EntryRef) -> StoreResult<Vec<Attachment>>;
    async fn trial_balance(
        &self,
        client_id: DbId,
        entity_id: Option<DbId>,
    ) -> StoreResult<Vec<AccountBalance>>;
    async fn export_journal_lines(
        &self,
        client_id: DbId,
        filter: &JournalEntryFilter,
    ) -> StoreResult<Vec<JournalLineExport>>;
}

#[async_trait]
pub trait AttachmentStore: Send + Sync {
    /// Record an upload. Entry-owned uploads require a draft parent.
    async fn create_attachment(&self, input: &NewAttachment) -> StoreResult<Attachment>;
    async fn find_attachment(&self, client_id: DbId, id: DbId) -> StoreResult<Option<Attachment>>;
    async fn list_entry_attachments(
        &self,
        client_id: DbId,
        journal_entry_id: DbId,
    ) -> StoreResult<Vec<Attachment>>;
    async fn list_staged_attachments(
        &self,
        client_id: DbId,
        staging_key: StagingKey,
    ) -> StoreResult<Vec<Attachment>>;
    /// Remove the metadata row, returning it so the caller can drop content.
    async fn delete_attachment(&self, client_id: DbId, id: DbId)
        -> StoreResult<Option<Attachment>>;
    /// Re-parent every staged upload of `staging_key` onto a draft entry.
    async fn promote_staged_attachments(
        &self,
        client_id: DbId,
        staging_key: StagingKey,
        journal_entry_id: DbId,
    ) -> StoreResult<Vec<Attachment>>;
    /// Remove staged uploads created before `cutoff`.
    async fn purge_staged_attachments(&self, cutoff: Timestamp) -> StoreResult<Vec<Attachment>>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create_user(&self, input: &CreateUser) -> StoreResult<User>;
    async fn find_user(&self, id: DbId) -> StoreResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    async fn list_users(&self) -> StoreResult<Vec<User>>;
    async fn record_login(&self, id: DbId) -> StoreResult<()>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, input: &CreateSession) -> StoreResult<UserSession>;
    /// Only sessions that are neither revoked nor expired.
    async fn find_active_session(&self, refresh_token_hash: &str)
        -> StoreResult<Option<UserSession>>;
    async fn revoke_session(&self, id: DbId) -> StoreResult<bool>;
    async fn revoke_user_sessions(&self, user_id: DbId) -> StoreResult<u64>;
    async fn purge_expired_sessions(&self) -> StoreResult<u64>;
}
