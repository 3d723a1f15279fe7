use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tally_core::filters::JournalEntryFilter;
use tally_core::journal::{ensure_editable, validate_post, validate_void, JournalStatus, LineSide};
use tally_core::types::DbId;

use super::MemoryStore;
use crate::error::{StoreError, StoreResult};
use crate::models::attachment::Attachment;
use crate::models::journal_entry::{
    CreateJournalEntry, CreateJournalLine, EntryRef, JournalEntry, JournalEntryWithLines,
    UpdateJournalEntry,
};
use crate::models::report::{AccountBalance, JournalLineExport};
use crate::stores::JournalEntryStore;

#[async_trait]
impl JournalEntryStore for MemoryStore {
    async fn create_journal_entry(
        &self,
        client_id: DbId,
        entity_id: DbId,
        created_by: DbId,
        input: &CreateJournalEntry,
    ) -> StoreResult<JournalEntryWithLines> {
        let currency = input.check_rules()?;

        let mut t = self.tables.write().await;
        t.ensure_reference_free(client_id, input.reference_number.as_deref(), None)?;
        t.ensure_accounts_usable(client_id, input.lines.iter().map(|l| &l.account_id))?;

        let now = Utc::now();
        let entry = JournalEntry {
            id: t.next_id(),
            client_id,
            entity_id,
            reference_number: input.reference_number.clone(),
            entry_date: input.entry_date,
            description: input.description.clone(),
            currency,
            status: JournalStatus::Draft,
            created_by,
            posted_at: None,
            posted_by: None,
            voided_at: None,
            voided_by: None,
            void_reason: None,
            created_at: now,
            updated_at: now,
        };
        for (line_no, line) in (1..).zip(&input.lines) {
            t.insert_line(
                entry.id,
                line_no,
                line.account_id,
                line.side,
                line.amount,
                line.memo.clone(),
            );
        }
        t.entries.insert(entry.id, entry.clone());
        t.with_lines(&entry)
    }

    async fn find_journal_entry(
        &self,
        entry: EntryRef,
    ) -> StoreResult<Option<JournalEntryWithLines>> {
        let t = self.tables.read().await;
        t.entries
            .get(&entry.id)
            .filter(|e| e.matches_ref(entry))
            .map(|e| t.with_lines(e))
            .transpose()
    }

    async fn list_journal_entries(
        &self,
        client_id: DbId,
        filter: &JournalEntryFilter,
    ) -> StoreResult<Vec<JournalEntry>> {
        let t = self.tables.read().await;
        let mut entries: Vec<JournalEntry> = t
            .entries
            .values()
            .filter(|e| e.client_id == client_id)
            .filter(|e| {
                filter.matches(
                    e.entity_id,
                    e.status,
                    e.entry_date,
                    e.reference_number.as_deref(),
                    &e.description,
                )
            })
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.entry_date.cmp(&a.entry_date).then(b.id.cmp(&a.id)));
        Ok(entries
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect())
    }

    async fn update_journal_entry(
        &self,
        entry: EntryRef,
        input: &UpdateJournalEntry,
    ) -> StoreResult<JournalEntryWithLines> {
        input.check_rules()?;

        let mut t = self.tables.write().await;
        ensure_editable(t.entry(entry.client_id, Some(entry.entity_id), entry.id)?.status)?;
        t.ensure_reference_free(
            entry.client_id,
            input.reference_number.as_deref(),
            Some(entry.id),
        )?;

        let Some(row) = t.entries.get_mut(&entry.id) else {
            return Err(StoreError::not_found("JournalEntry", entry.id));
        };
        if let Some(reference) = &input.reference_number {
            row.reference_number = Some(reference.clone());
        }
        if let Some(entry_date) = input.entry_date {
            row.entry_date = entry_date;
        }
        if let Some(description) = &input.description {
            row.description = description.clone();
        }
        if let Some(currency) = &input.currency {
            row.currency = currency.clone();
        }
        row.updated_at = Utc::now();
        let row = row.clone();
        t.with_lines(&row)
    }

    async fn add_journal_line(
        &self,
        entry: EntryRef,
        input: &CreateJournalLine,
    ) -> StoreResult<JournalEntryWithLines> {
        input.check_rules()?;

        let mut t = self.tables.write().await;
        let current = t.entry(entry.client_id, Some(entry.entity_id), entry.id)?.clone();
        ensure_editable(current.status)?;
        t.ensure_accounts_usable(entry.client_id, [&input.account_id])?;

        let next_line_no = t
            .lines_of(entry.id)
            .iter()
            .map(|l| l.line_no)
            .max()
            .unwrap_or(0)
            + 1;
        t.insert_line(
            entry.id,
            next_line_no,
            input.account_id,
            input.side,
            input.amount,
            input.memo.clone(),
        );
        t.with_lines(&current)
    }

    async fn remove_journal_line(
        &self,
        entry: EntryRef,
        line_id: DbId,
    ) -> StoreResult<JournalEntryWithLines> {
        let mut t = self.tables.write().await;
        let current = t.entry(entry.client_id, Some(entry.entity_id), entry.id)?.clone();
        ensure_editable(current.status)?;

        let owned = t
            .lines
            .get(&line_id)
            .is_some_and(|l| l.journal_entry_id == entry.id);
        if !owned {
            return Err(StoreError::not_found("JournalLine", line_id));
        }
        t.lines.remove(&line_id);
        t.with_lines(&current)
    }

    async fn post_journal_entry(
        &self,
        entry: EntryRef,
        posted_by: DbId,
    ) -> StoreResult<JournalEntryWithLines> {
        let mut t = self.tables.write().await;
        let current = t.entry(entry.client_id, Some(entry.entity_id), entry.id)?.clone();
        let snapshot = t.with_lines(&current)?;
        validate_post(current.status, &snapshot.totals, snapshot.lines.len())?;

        let Some(row) = t.entries.get_mut(&entry.id) else {
            return Err(StoreError::not_found("JournalEntry", entry.id));
        };
        let now = Utc::now();
        row.status = JournalStatus::Posted;
        row.posted_at = Some(now);
        row.posted_by = Some(posted_by);
        row.updated_at = now;
        let row = row.clone();

        tracing::info!(journal_entry_id = entry.id, posted_by, "Posted journal entry");
        t.with_lines(&row)
    }

    async fn void_journal_entry(
        &self,
        entry: EntryRef,
        voided_by: DbId,
        reason: Option<&str>,
    ) -> StoreResult<JournalEntryWithLines> {
        let mut t = self.tables.write().await;
        validate_void(t.entry(entry.client_id, Some(entry.entity_id), entry.id)?.status)?;

        let Some(row) = t.entries.get_mut(&entry.id) else {
            return Err(StoreError::not_found("JournalEntry", entry.id));
        };
        let now = Utc::now();
        row.status = JournalStatus::Voided;
        row.voided_at = Some(now);
        row.voided_by = Some(voided_by);
        row.void_reason = reason.map(str::to_string);
        row.updated_at = now;
        let row = row.clone();

        tracing::info!(journal_entry_id = entry.id, voided_by, "Voided journal entry");
        t.with_lines(&row)
    }

    async fn delete_journal_entry(&self, entry: EntryRef) -> StoreResult<Vec<Attachment>> {
        let mut t = self.tables.write().await;
        ensure_editable(t.entry(entry.client_id, Some(entry.entity_id), entry.id)?.status)?;

        t.entries.remove(&entry.id);
        t.lines.retain(|_, l| l.journal_entry_id != entry.id);
        let (removed, kept): (BTreeMap<_, _>, BTreeMap<_, _>) = std::mem::take(&mut t.attachments)
            .into_iter()
            .partition(|(_, a)| a.journal_entry_id == Some(entry.id));
        t.attachments = kept;
        Ok(removed.into_values().collect())
    }

    async fn trial_balance(
        &self,
        client_id: DbId,
        entity_id: Option<DbId>,
    ) -> StoreResult<Vec<AccountBalance>> {
        let t = self.tables.read().await;
        let mut totals: BTreeMap<DbId, (Decimal, Decimal)> = BTreeMap::new();
        for line in t.lines.values() {
            let Some(entry) = t.entries.get(&line.journal_entry_id) else {
                continue;
            };
            if entry.client_id != client_id
                || entry.status != JournalStatus::Posted
                || entity_id.is_some_and(|id| id != entry.entity_id)
            {
                continue;
            }
            let (debits, credits) = totals.entry(line.account_id).or_default();
            let slot = match line.side {
                LineSide::Debit => debits,
                LineSide::Credit => credits,
            };
            *slot = slot.checked_add(line.amount).ok_or_else(|| {
                StoreError::validation("Account totals exceed the supported amount range")
            })?;
        }

        let mut balances: Vec<AccountBalance> = totals
            .into_iter()
            .filter_map(|(account_id, (debit_total, credit_total))| {
                let account = t.accounts.get(&account_id)?;
                Some(AccountBalance {
                    account_id,
                    account_code: account.code.clone(),
                    account_name: account.name.clone(),
                    account_type: account.account_type,
                    debit_total,
                    credit_total,
                    net: debit_total - credit_total,
                })
            })
            .collect();
        balances.sort_by(|a, b| a.account_code.cmp(&b.account_code));
        Ok(balances)
    }

    async fn export_journal_lines(
        &self,
        client_id: DbId,
        filter: &JournalEntryFilter,
    ) -> StoreResult<Vec<JournalLineExport>> {
        let t = self.tables.read().await;
        let mut rows: Vec<JournalLineExport> = t
            .lines
            .values()
            .filter_map(|line| {
                let entry = t.entries.get(&line.journal_entry_id)?;
                let matches = entry.client_id == client_id
                    && filter.matches(
                        entry.entity_id,
                        entry.status,
                        entry.entry_date,
                        entry.reference_number.as_deref(),
                        &entry.description,
                    );
                if !matches {
                    return None;
                }
                let account = t.accounts.get(&line.account_id)?;
                Some(JournalLineExport {
                    journal_entry_id: entry.id,
                    entity_id: entry.entity_id,
                    reference_number: entry.reference_number.clone(),
                    entry_date: entry.entry_date,
                    status: entry.status,
                    currency: entry.currency.clone(),
                    description: entry.description.clone(),
                    line_no: line.line_no,
                    account_id: line.account_id,
                    account_code: account.code.clone(),
                    side: line.side,
                    amount: line.amount,
                    memo: line.memo.clone(),
                })
            })
            .collect();
        rows.sort_by(|a, b| {
            a.entry_date
                .cmp(&b.entry_date)
                .then(a.journal_entry_id.cmp(&b.journal_entry_id))
                .then(a.line_no.cmp(&b.line_no))
        });
        Ok(rows)
    }
}
