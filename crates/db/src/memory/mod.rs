//! In-process storage backend.
//!
//! One [`MemoryStore`] implements every storage trait over a single set of
//! tables behind a `tokio::sync::RwLock`. Each mutating call takes the write
//! lock once, so a status check and the write it guards are atomic exactly
//! as they are under a Postgres row lock.

mod accounts;
mod attachments;
mod clients;
mod entities;
mod journal_entries;
mod sessions;
mod users;

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tally_core::journal::{JournalStatus, LineSide, AMOUNT_SCALE};
use tally_core::types::DbId;
use tokio::sync::RwLock;

use crate::error::{StoreError, StoreResult};
use crate::models::account::Account;
use crate::models::attachment::Attachment;
use crate::models::client::Client;
use crate::models::entity::Entity;
use crate::models::journal_entry::{JournalEntry, JournalEntryWithLines, JournalLine};
use crate::models::session::UserSession;
use crate::models::user::User;

#[derive(Default)]
pub(crate) struct Tables {
    next_id: DbId,
    clients: BTreeMap<DbId, Client>,
    entities: BTreeMap<DbId, Entity>,
    accounts: BTreeMap<DbId, Account>,
    entries: BTreeMap<DbId, JournalEntry>,
    lines: BTreeMap<DbId, JournalLine>,
    attachments: BTreeMap<DbId, Attachment>,
    users: BTreeMap<DbId, User>,
    sessions: BTreeMap<DbId, UserSession>,
}

impl Tables {
    /// Ids are shared across tables, which is fine as they are only unique
    /// per table in Postgres anyway.
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn lines_of(&self, entry_id: DbId) -> Vec<JournalLine> {
        self.lines
            .values()
            .filter(|l| l.journal_entry_id == entry_id)
            .cloned()
            .collect()
    }

    fn with_lines(&self, entry: &JournalEntry) -> StoreResult<JournalEntryWithLines> {
        Ok(JournalEntryWithLines::new(entry.clone(), self.lines_of(entry.id))?)
    }

    /// Entry scoped to a client and, if given, an entity.
    fn entry(
        &self,
        client_id: DbId,
        entity_id: Option<DbId>,
        id: DbId,
    ) -> StoreResult<&JournalEntry> {
        self.entries
            .get(&id)
            .filter(|e| e.client_id == client_id && entity_id.map_or(true, |eid| e.entity_id == eid))
            .ok_or_else(|| StoreError::not_found("JournalEntry", id))
    }

    fn entry_status(&self, client_id: DbId, id: DbId) -> StoreResult<JournalStatus> {
        self.entry(client_id, None, id).map(|e| e.status)
    }

    fn ensure_accounts_usable<'a>(
        &self,
        client_id: DbId,
        account_ids: impl IntoIterator<Item = &'a DbId>,
    ) -> StoreResult<()> {
        for id in account_ids {
            let usable = self
                .accounts
                .get(id)
                .is_some_and(|a| a.client_id == client_id && a.is_active);
            if !usable {
                return Err(StoreError::validation(format!(
                    "Account {id} is not an active account of this client"
                )));
            }
        }
        Ok(())
    }

    fn ensure_reference_free(
        &self,
        client_id: DbId,
        reference: Option<&str>,
        exclude_id: Option<DbId>,
    ) -> StoreResult<()> {
        let Some(reference) = reference else {
            return Ok(());
        };
        let taken = self.entries.values().any(|e| {
            e.client_id == client_id
                && e.reference_number.as_deref() == Some(reference)
                && Some(e.id) != exclude_id
        });
        if taken {
            return Err(StoreError::conflict(format!(
                "Reference number '{reference}' is already used by another journal entry"
            )));
        }
        Ok(())
    }

    fn insert_line(
        &mut self,
        entry_id: DbId,
        line_no: i32,
        account_id: DbId,
        side: LineSide,
        amount: Decimal,
        memo: Option<String>,
    ) {
        let id = self.next_id();
        // Match NUMERIC(18,2) so both backends serialise amounts alike.
        let mut amount = amount;
        amount.rescale(AMOUNT_SCALE);
        self.lines.insert(
            id,
            JournalLine {
                id,
                journal_entry_id: entry_id,
                line_no,
                account_id,
                side,
                amount,
                memo,
                created_at: chrono::Utc::now(),
            },
        );
    }
}

/// Every storage trait over shared in-memory tables.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}
