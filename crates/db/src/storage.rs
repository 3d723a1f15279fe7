//! The persistence façade.
//!
//! `Storage` owns one handle per domain module and forwards every call to
//! exactly one of them. It holds no query logic; anything that touches data
//! belongs in the module that owns the table.

use std::sync::Arc;

use tally_core::attachment::StagingKey;
use tally_core::filters::JournalEntryFilter;
use tally_core::types::{DbId, Timestamp};

use crate::error::StoreResult;
use crate::files::{FileStore, MemoryFileStore};
use crate::memory::MemoryStore;
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
use crate::repositories::{
    AccountRepo, AttachmentRepo, ClientRepo, EntityRepo, JournalEntryRepo, SessionRepo, UserRepo,
};
use crate::stores::{
    AccountStore, AttachmentStore, ClientStore, EntityStore, JournalEntryStore, SessionStore,
    UserStore,
};
use crate::DbPool;

/// The set of modules a [`Storage`] is assembled from.
pub struct StorageModules {
    pub clients: Arc<dyn ClientStore>,
    pub entities: Arc<dyn EntityStore>,
    pub accounts: Arc<dyn AccountStore>,
    pub journal_entries: Arc<dyn JournalEntryStore>,
    pub attachments: Arc<dyn AttachmentStore>,
    pub users: Arc<dyn UserStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub files: Arc<dyn FileStore>,
}

/// Aggregating handle over every storage module. Cheap to clone.
#[derive(Clone)]
pub struct Storage {
    clients: Arc<dyn ClientStore>,
    entities: Arc<dyn EntityStore>,
    accounts: Arc<dyn AccountStore>,
    journal_entries: Arc<dyn JournalEntryStore>,
    attachments: Arc<dyn AttachmentStore>,
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    files: Arc<dyn FileStore>,
}

impl From<StorageModules> for Storage {
    fn from(m: StorageModules) -> Self {
        Self {
            clients: m.clients,
            entities: m.entities,
            accounts: m.accounts,
            journal_entries: m.journal_entries,
            attachments: m.attachments,
            users: m.users,
            sessions: m.sessions,
            files: m.files,
        }
    }
}

impl Storage {
    /// Wire the Postgres repositories over `pool`.
    pub fn postgres(pool: DbPool, files: Arc<dyn FileStore>) -> Self {
        StorageModules {
            clients: Arc::new(ClientRepo::new(pool.clone())),
            entities: Arc::new(EntityRepo::new(pool.clone())),
            accounts: Arc::new(AccountRepo::new(pool.clone())),
            journal_entries: Arc::new(JournalEntryRepo::new(pool.clone())),
            attachments: Arc::new(AttachmentRepo::new(pool.clone())),
            users: Arc::new(UserRepo::new(pool.clone())),
            sessions: Arc::new(SessionRepo::new(pool)),
            files,
        }
        .into()
    }

    /// Wire a fresh in-process backend with in-memory file content.
    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        StorageModules {
            clients: store.clone(),
            entities: store.clone(),
            accounts: store.clone(),
            journal_entries: store.clone(),
            attachments: store.clone(),
            users: store.clone(),
            sessions: store,
            files: Arc::new(MemoryFileStore::new()),
        }
        .into()
    }

    // --- clients ---

    pub async fn create_client(&self, input: &CreateClient) -> StoreResult<Client> {
        self.clients.create_client(input).await
    }

    pub async fn find_client(&self, id: DbId) -> StoreResult<Option<Client>> {
        self.clients.find_client(id).await
    }

    pub async fn list_clients(&self, include_deleted: bool) -> StoreResult<Vec<Client>> {
        self.clients.list_clients(include_deleted).await
    }

    pub async fn update_client(&self, id: DbId, input: &UpdateClient) -> StoreResult<Option<Client>> {
        self.clients.update_client(id, input).await
    }

    pub async fn soft_delete_client(&self, id: DbId) -> StoreResult<bool> {
        self.clients.soft_delete_client(id).await
    }

    pub async fn restore_client(&self, id: DbId) -> StoreResult<bool> {
        self.clients.restore_client(id).await
    }

    // --- entities ---

    pub async fn create_entity(&self, client_id: DbId, input: &CreateEntity) -> StoreResult<Entity> {
        self.entities.create_entity(client_id, input).await
    }

    pub async fn find_entity(&self, client_id: DbId, id: DbId) -> StoreResult<Option<Entity>> {
        self.entities.find_entity(client_id, id).await
    }

    pub async fn list_entities(
        &self,
        client_id: DbId,
        include_inactive: bool,
    ) -> StoreResult<Vec<Entity>> {
        self.entities.list_entities(client_id, include_inactive).await
    }

    pub async fn list_selectable_entities(
        &self,
        client_id: DbId,
        selected_id: Option<DbId>,
    ) -> StoreResult<Vec<Entity>> {
        self.entities.list_selectable_entities(client_id, selected_id).await
    }

    pub async fn update_entity(
        &self,
        client_id: DbId,
        id: DbId,
        input: &UpdateEntity,
    ) -> StoreResult<Option<Entity>> {
        self.entities.update_entity(client_id, id, input).await
    }

    pub async fn soft_delete_entity(&self, client_id: DbId, id: DbId) -> StoreResult<bool> {
        self.entities.soft_delete_entity(client_id, id).await
    }

    // --- accounts ---

    pub async fn create_account(
        &self,
        client_id: DbId,
        input: &CreateAccount,
    ) -> StoreResult<Account> {
        self.accounts.create_account(client_id, input).await
    }

    pub async fn find_account(&self, client_id: DbId, id: DbId) -> StoreResult<Option<Account>> {
        self.accounts.find_account(client_id, id).await
    }

    pub async fn list_accounts(
        &self,
        client_id: DbId,
        include_inactive: bool,
    ) -> StoreResult<Vec<Account>> {
        self.accounts.list_accounts(client_id, include_inactive).await
    }

    pub async fn update_account(
        &self,
        client_id: DbId,
        id: DbId,
        input: &UpdateAccount,
    ) -> StoreResult<Option<Account>> {
        self.accounts.update_account(client_id, id, input).await
    }

    pub async fn deactivate_account(&self, client_id: DbId, id: DbId) -> StoreResult<bool> {
        self.accounts.deactivate_account(client_id, id).await
    }

    // --- journal entries ---

    pub async fn create_journal_entry(
        &self,
        client_id: DbId,
        entity_id: DbId,
        created_by: DbId,
        input: &CreateJournalEntry,
    ) -> StoreResult<JournalEntryWithLines> {
        self.journal_entries
            .create_journal_entry(client_id, entity_id, created_by, input)
            .await
    }

    pub async fn find_journal_entry(
        &self,
        entry: EntryRef,
    ) -> StoreResult<Option<JournalEntryWithLines>> {
        self.journal_entries.find_journal_entry(entry).await
    }

    pub async fn list_journal_entries(
        &self,
        client_id: DbId,
        filter: &JournalEntryFilter,
    ) -> StoreResult<Vec<JournalEntry>> {
        self.journal_entries.list_journal_entries(client_id, filter).await
    }

    pub async fn update_journal_entry(
        &self,
        entry: EntryRef,
        input: &UpdateJournalEntry,
    ) -> StoreResult<JournalEntryWithLines> {
        self.journal_entries.update_journal_entry(entry, input).await
    }

    pub async fn add_journal_line(
        &self,
        entry: EntryRef,
        input: &CreateJournalLine,
    ) -> StoreResult<JournalEntryWithLines> {
        self.journal_entries.add_journal_line(entry, input).await
    }

    pub async fn remove_journal_line(
        &self,
        entry: EntryRef,
        line_id: DbId,
    ) -> StoreResult<JournalEntryWithLines> {
        self.journal_entries.remove_journal_line(entry, line_id).await
    }

    pub async fn post_journal_entry(
        &self,
        entry: EntryRef,
        posted_by: DbId,
    ) -> StoreResult<JournalEntryWithLines> {
        self.journal_entries.post_journal_entry(entry, posted_by).await
    }

    pub async fn void_journal_entry(
        &self,
        entry: EntryRef,
        voided_by: DbId,
        reason: Option<&str>,
    ) -> StoreResult<JournalEntryWithLines> {
        self.journal_entries.void_journal_entry(entry, voided_by, reason).await
    }

    pub async fn delete_journal_entry(&self, entry: EntryRef) -> StoreResult<Vec<Attachment>> {
        self.journal_entries.delete_journal_entry(entry).await
    }

    pub async fn trial_balance(
        &self,
        client_id: DbId,
        entity_id: Option<DbId>,
    ) -> StoreResult<Vec<AccountBalance>> {
        self.journal_entries.trial_balance(client_id, entity_id).await
    }

    pub async fn export_journal_lines(
        &self,
        client_id: DbId,
        filter: &JournalEntryFilter,
    ) -> StoreResult<Vec<JournalLineExport>> {
        self.journal_entries.export_journal_lines(client_id, filter).await
    }

    // --- attachments ---

    pub async fn create_attachment(&self, input: &NewAttachment) -> StoreResult<Attachment> {
        self.attachments.create_attachment(input).await
    }

    pub async fn find_attachment(&self, client_id: DbId, id: DbId) -> StoreResult<Option<Attachment>> {
        self.attachments.find_attachment(client_id, id).await
    }

    pub async fn list_entry_attachments(
        &self,
        client_id: DbId,
        journal_entry_id: DbId,
    ) -> StoreResult<Vec<Attachment>> {
        self.attachments.list_entry_attachments(client_id, journal_entry_id).await
    }

    pub async fn list_staged_attachments(
        &self,
        client_id: DbId,
        staging_key: StagingKey,
    ) -> StoreResult<Vec<Attachment>> {
        self.attachments.list_staged_attachments(client_id, staging_key).await
    }

    pub async fn delete_attachment(
        &self,
        client_id: DbId,
        id: DbId,
    ) -> StoreResult<Option<Attachment>> {
        self.attachments.delete_attachment(client_id, id).await
    }

    pub async fn promote_staged_attachments(
        &self,
        client_id: DbId,
        staging_key: StagingKey,
        journal_entry_id: DbId,
    ) -> StoreResult<Vec<Attachment>> {
        self.attachments
            .promote_staged_attachments(client_id, staging_key, journal_entry_id)
            .await
    }

    pub async fn purge_staged_attachments(&self, cutoff: Timestamp) -> StoreResult<Vec<Attachment>> {
        self.attachments.purge_staged_attachments(cutoff).await
    }

    // --- users ---

    pub async fn create_user(&self, input: &CreateUser) -> StoreResult<User> {
        self.users.create_user(input).await
    }

    pub async fn find_user(&self, id: DbId) -> StoreResult<Option<User>> {
        self.users.find_user(id).await
    }

    pub async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        self.users.find_user_by_username(username).await
    }

    pub async fn list_users(&self) -> StoreResult<Vec<User>> {
        self.users.list_users().await
    }

    pub async fn record_login(&self, id: DbId) -> StoreResult<()> {
        self.users.record_login(id).await
    }

    // --- sessions ---

    pub async fn create_session(&self, input: &CreateSession) -> StoreResult<UserSession> {
        self.sessions.create_session(input).await
    }

    pub async fn find_active_session(
        &self,
        refresh_token_hash: &str,
    ) -> StoreResult<Option<UserSession>> {
        self.sessions.find_active_session(refresh_token_hash).await
    }

    pub async fn revoke_session(&self, id: DbId) -> StoreResult<bool> {
        self.sessions.revoke_session(id).await
    }

    pub async fn revoke_user_sessions(&self, user_id: DbId) -> StoreResult<u64> {
        self.sessions.revoke_user_sessions(user_id).await
    }

    pub async fn purge_expired_sessions(&self) -> StoreResult<u64> {
        self.sessions.purge_expired_sessions().await
    }

    // --- file content ---

    pub async fn put_file(&self, storage_key: &str, bytes: Vec<u8>) -> StoreResult<()> {
        self.files.put_file(storage_key, bytes).await
    }

    pub async fn read_file(&self, storage_key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.files.read_file(storage_key).await
    }

    pub async fn delete_file(&self, storage_key: &str) -> StoreResult<bool> {
        self.files.delete_file(storage_key).await
    }
}
