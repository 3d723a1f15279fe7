//! Repository for `journal_entries` and their `journal_entry_lines`.
//!
//! Every status-dependent mutation locks the entry row with `FOR UPDATE`
//! inside a transaction, re-reads its status, applies the lifecycle guard
//! from `tally_core::journal` and only then writes.

use std::collections::HashSet;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tally_core::filters::JournalEntryFilter;
use tally_core::journal::{
    ensure_editable, validate_post, validate_void, JournalStatus, LineTotals,
};
use tally_core::types::DbId;

use crate::error::{StoreError, StoreResult};
use crate::models::attachment::Attachment;
use crate::models::journal_entry::{
    CreateJournalEntry, CreateJournalLine, EntryRef, JournalEntry, JournalEntryWithLines,
    JournalLine, UpdateJournalEntry,
};
use crate::models::report::{AccountBalance, JournalLineExport};
use crate::repositories::attachment_repo;
use crate::stores::JournalEntryStore;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, client_id, entity_id, reference_number, entry_date, description, \
                        currency, status, created_by, posted_at, posted_by, voided_at, \
                        voided_by, void_reason, created_at, updated_at";

const LINE_COLUMNS: &str = "id, journal_entry_id, line_no, account_id, side, amount, memo, \
                             created_at";

pub struct JournalEntryRepo {
    pool: PgPool,
}

impl JournalEntryRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Load an entry with its lines outside any transaction.
    async fn load(&self, entry: EntryRef) -> StoreResult<Option<JournalEntryWithLines>> {
        let mut conn = self.pool.acquire().await?;
        let query = format!(
            "SELECT {COLUMNS} FROM journal_entries
             WHERE id = $1 AND client_id = $2 AND entity_id = $3"
        );
        let Some(row) = sqlx::query_as::<_, JournalEntry>(&query)
            .bind(entry.id)
            .bind(entry.client_id)
            .bind(entry.entity_id)
            .fetch_optional(&mut *conn)
            .await?
        else {
            return Ok(None);
        };
        let lines = load_lines(&mut conn, row.id).await?;
        Ok(Some(JournalEntryWithLines::new(row, lines)?))
    }
}

/// Lock one entry row for the rest of the transaction.
///
/// `entity_id` of `None` skips the entity scope; attachment routes address
/// entries by client only.
pub(crate) async fn lock_entry(
    conn: &mut PgConnection,
    client_id: DbId,
    entity_id: Option<DbId>,
    id: DbId,
) -> StoreResult<JournalEntry> {
    let query = format!(
        "SELECT {COLUMNS} FROM journal_entries
         WHERE id = $1 AND client_id = $2 AND ($3::BIGINT IS NULL OR entity_id = $3)
         FOR UPDATE"
    );
    sqlx::query_as::<_, JournalEntry>(&query)
        .bind(id)
        .bind(client_id)
        .bind(entity_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| StoreError::not_found("JournalEntry", id))
}

async fn load_lines(conn: &mut PgConnection, entry_id: DbId) -> StoreResult<Vec<JournalLine>> {
    let query = format!(
        "SELECT {LINE_COLUMNS} FROM journal_entry_lines
         WHERE journal_entry_id = $1
         ORDER BY line_no, id"
    );
    let lines = sqlx::query_as::<_, JournalLine>(&query)
        .bind(entry_id)
        .fetch_all(&mut *conn)
        .await?;
    Ok(lines)
}

/// Lines may only reference active accounts of the entry's client.
async fn ensure_accounts_usable(
    conn: &mut PgConnection,
    client_id: DbId,
    account_ids: &[DbId],
) -> StoreResult<()> {
    if account_ids.is_empty() {
        return Ok(());
    }
    let usable: HashSet<DbId> = sqlx::query_as::<_, (DbId,)>(
        "SELECT id FROM accounts WHERE client_id = $1 AND is_active AND id = ANY($2)",
    )
    .bind(client_id)
    .bind(account_ids)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|(id,)| id)
    .collect();

    match account_ids.iter().find(|id| !usable.contains(id)) {
        Some(id) => Err(StoreError::validation(format!(
            "Account {id} is not an active account of this client"
        ))),
        None => Ok(()),
    }
}

/// Reference numbers are unique per client. The `uq_journal_entries_client_reference`
/// constraint backs this up under concurrent inserts.
async fn ensure_reference_free(
    conn: &mut PgConnection,
    client_id: DbId,
    reference: Option<&str>,
    exclude_id: Option<DbId>,
) -> StoreResult<()> {
    let Some(reference) = reference else {
        return Ok(());
    };
    let taken: Option<(DbId,)> = sqlx::query_as(
        "SELECT id FROM journal_entries
         WHERE client_id = $1 AND reference_number = $2
           AND ($3::BIGINT IS NULL OR id <> $3)",
    )
    .bind(client_id)
    .bind(reference)
    .bind(exclude_id)
    .fetch_optional(&mut *conn)
    .await?;
    if taken.is_some() {
        return Err(StoreError::conflict(format!(
            "Reference number '{reference}' is already used by another journal entry"
        )));
    }
    Ok(())
}

async fn insert_line(
    conn: &mut PgConnection,
    entry_id: DbId,
    line_no: i32,
    line: &CreateJournalLine,
) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO journal_entry_lines (journal_entry_id, line_no, account_id, side, amount, memo)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(entry_id)
    .bind(line_no)
    .bind(line.account_id)
    .bind(line.side.as_str())
    .bind(line.amount)
    .bind(&line.memo)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// `ILIKE` pattern for a free-text search, with wildcards in the needle escaped.
fn search_pattern(search: Option<&str>) -> Option<String> {
    search.map(|s| {
        let escaped = s
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        format!("%{escaped}%")
    })
}

#[async_trait]
impl JournalEntryStore for JournalEntryRepo {
    async fn create_journal_entry(
        &self,
        client_id: DbId,
        entity_id: DbId,
        created_by: DbId,
        input: &CreateJournalEntry,
    ) -> StoreResult<JournalEntryWithLines> {
        let currency = input.check_rules()?;

        let mut tx = self.pool.begin().await?;
        ensure_reference_free(&mut tx, client_id, input.reference_number.as_deref(), None).await?;
        let account_ids: Vec<DbId> = input.lines.iter().map(|l| l.account_id).collect();
        ensure_accounts_usable(&mut tx, client_id, &account_ids).await?;

        let query = format!(
            "INSERT INTO journal_entries
                (client_id, entity_id, reference_number, entry_date, description, currency,
                 status, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {COLUMNS}"
        );
        let entry = sqlx::query_as::<_, JournalEntry>(&query)
            .bind(client_id)
            .bind(entity_id)
            .bind(&input.reference_number)
            .bind(input.entry_date)
            .bind(&input.description)
            .bind(&currency)
            .bind(JournalStatus::Draft.as_str())
            .bind(created_by)
            .fetch_one(&mut *tx)
            .await?;

        for (line_no, line) in (1..).zip(&input.lines) {
            insert_line(&mut tx, entry.id, line_no, line).await?;
        }
        let lines = load_lines(&mut tx, entry.id).await?;
        tx.commit().await?;

        tracing::debug!(
            journal_entry_id = entry.id,
            client_id,
            lines = lines.len(),
            "Created draft journal entry"
        );
        Ok(JournalEntryWithLines::new(entry, lines)?)
    }

    async fn find_journal_entry(
        &self,
        entry: EntryRef,
    ) -> StoreResult<Option<JournalEntryWithLines>> {
        self.load(entry).await
    }

    async fn list_journal_entries(
        &self,
        client_id: DbId,
        filter: &JournalEntryFilter,
    ) -> StoreResult<Vec<JournalEntry>> {
        let query = format!(
            "SELECT {COLUMNS} FROM journal_entries
             WHERE client_id = $1
               AND ($2::BIGINT IS NULL OR entity_id = $2)
               AND ($3::TEXT IS NULL OR status = $3)
               AND ($4::DATE IS NULL OR entry_date >= $4)
               AND ($5::DATE IS NULL OR entry_date <= $5)
               AND ($6::TEXT IS NULL OR reference_number ILIKE $6 OR description ILIKE $6)
             ORDER BY entry_date DESC, id DESC
             LIMIT $7 OFFSET $8"
        );
        let entries = sqlx::query_as::<_, JournalEntry>(&query)
            .bind(client_id)
            .bind(filter.entity_id)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.from)
            .bind(filter.to)
            .bind(search_pattern(filter.search.as_deref()))
            .bind(filter.limit)
            .bind(filter.offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }

    async fn update_journal_entry(
        &self,
        entry: EntryRef,
        input: &UpdateJournalEntry,
    ) -> StoreResult<JournalEntryWithLines> {
        input.check_rules()?;

        let mut tx = self.pool.begin().await?;
        let current = lock_entry(&mut tx, entry.client_id, Some(entry.entity_id), entry.id).await?;
        ensure_editable(current.status)?;
        ensure_reference_free(
            &mut tx,
            entry.client_id,
            input.reference_number.as_deref(),
            Some(entry.id),
        )
        .await?;

        let query = format!(
            "UPDATE journal_entries SET
                reference_number = COALESCE($2, reference_number),
                entry_date = COALESCE($3, entry_date),
                description = COALESCE($4, description),
                currency = COALESCE($5, currency)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let updated = sqlx::query_as::<_, JournalEntry>(&query)
            .bind(entry.id)
            .bind(&input.reference_number)
            .bind(input.entry_date)
            .bind(&input.description)
            .bind(&input.currency)
            .fetch_one(&mut *tx)
            .await?;
        let lines = load_lines(&mut tx, entry.id).await?;
        tx.commit().await?;
        Ok(JournalEntryWithLines::new(updated, lines)?)
    }

    async fn add_journal_line(
        &self,
        entry: EntryRef,
        input: &CreateJournalLine,
    ) -> StoreResult<JournalEntryWithLines> {
        input.check_rules()?;

        let mut tx = self.pool.begin().await?;
        let current = lock_entry(&mut tx, entry.client_id, Some(entry.entity_id), entry.id).await?;
        ensure_editable(current.status)?;
        ensure_accounts_usable(&mut tx, entry.client_id, &[input.account_id]).await?;

        let (next_line_no,): (i32,) = sqlx::query_as(
            "SELECT COALESCE(MAX(line_no), 0) + 1 FROM journal_entry_lines
             WHERE journal_entry_id = $1",
        )
        .bind(entry.id)
        .fetch_one(&mut *tx)
        .await?;
        insert_line(&mut tx, entry.id, next_line_no, input).await?;

        let lines = load_lines(&mut tx, entry.id).await?;
        tx.commit().await?;
        Ok(JournalEntryWithLines::new(current, lines)?)
    }

    async fn remove_journal_line(
        &self,
        entry: EntryRef,
        line_id: DbId,
    ) -> StoreResult<JournalEntryWithLines> {
        let mut tx = self.pool.begin().await?;
        let current = lock_entry(&mut tx, entry.client_id, Some(entry.entity_id), entry.id).await?;
        ensure_editable(current.status)?;

        let result =
            sqlx::query("DELETE FROM journal_entry_lines WHERE id = $1 AND journal_entry_id = $2")
                .bind(line_id)
                .bind(entry.id)
                .execute(&mut *tx)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("JournalLine", line_id));
        }

        let lines = load_lines(&mut tx, entry.id).await?;
        tx.commit().await?;
        Ok(JournalEntryWithLines::new(current, lines)?)
    }

    async fn post_journal_entry(
        &self,
        entry: EntryRef,
        posted_by: DbId,
    ) -> StoreResult<JournalEntryWithLines> {
        let mut tx = self.pool.begin().await?;
        let current = lock_entry(&mut tx, entry.client_id, Some(entry.entity_id), entry.id).await?;
        let lines = load_lines(&mut tx, entry.id).await?;
        let totals = LineTotals::from_lines(lines.iter().map(|l| (l.side, l.amount)))?;
        validate_post(current.status, &totals, lines.len())?;

        let query = format!(
            "UPDATE journal_entries SET status = $2, posted_at = NOW(), posted_by = $3
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let posted = sqlx::query_as::<_, JournalEntry>(&query)
            .bind(entry.id)
            .bind(JournalStatus::Posted.as_str())
            .bind(posted_by)
            .fetch_one(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(journal_entry_id = entry.id, posted_by, "Posted journal entry");
        Ok(JournalEntryWithLines::new(posted, lines)?)
    }

    async fn void_journal_entry(
        &self,
        entry: EntryRef,
        voided_by: DbId,
        reason: Option<&str>,
    ) -> StoreResult<JournalEntryWithLines> {
        let mut tx = self.pool.begin().await?;
        let current = lock_entry(&mut tx, entry.client_id, Some(entry.entity_id), entry.id).await?;
        validate_void(current.status)?;

        let query = format!(
            "UPDATE journal_entries
             SET status = $2, voided_at = NOW(), voided_by = $3, void_reason = $4
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let voided = sqlx::query_as::<_, JournalEntry>(&query)
            .bind(entry.id)
            .bind(JournalStatus::Voided.as_str())
            .bind(voided_by)
            .bind(reason)
            .fetch_one(&mut *tx)
            .await?;
        let lines = load_lines(&mut tx, entry.id).await?;
        tx.commit().await?;

        tracing::info!(journal_entry_id = entry.id, voided_by, "Voided journal entry");
        Ok(JournalEntryWithLines::new(voided, lines)?)
    }

    async fn delete_journal_entry(&self, entry: EntryRef) -> StoreResult<Vec<Attachment>> {
        let mut tx = self.pool.begin().await?;
        let current = lock_entry(&mut tx, entry.client_id, Some(entry.entity_id), entry.id).await?;
        ensure_editable(current.status)?;

        let attachments = attachment_repo::delete_for_entry(&mut tx, entry.id).await?;
        sqlx::query("DELETE FROM journal_entries WHERE id = $1")
            .bind(entry.id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(attachments)
    }

    /// Only posted entries count; voided entries drop out.
    async fn trial_balance(
        &self,
        client_id: DbId,
        entity_id: Option<DbId>,
    ) -> StoreResult<Vec<AccountBalance>> {
        let balances = sqlx::query_as::<_, AccountBalance>(
            "SELECT a.id AS account_id,
                    a.code AS account_code,
                    a.name AS account_name,
                    a.account_type,
                    COALESCE(SUM(l.amount) FILTER (WHERE l.side = 'debit'), 0) AS debit_total,
                    COALESCE(SUM(l.amount) FILTER (WHERE l.side = 'credit'), 0) AS credit_total,
                    COALESCE(SUM(CASE WHEN l.side = 'debit' THEN l.amount ELSE -l.amount END), 0)
                        AS net
             FROM journal_entry_lines l
             JOIN journal_entries e ON e.id = l.journal_entry_id
             JOIN accounts a ON a.id = l.account_id
             WHERE e.client_id = $1
               AND e.status = 'posted'
               AND ($2::BIGINT IS NULL OR e.entity_id = $2)
             GROUP BY a.id, a.code, a.name, a.account_type
             ORDER BY a.code",
        )
        .bind(client_id)
        .bind(entity_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(balances)
    }

    /// Paging fields of the filter are ignored; an export covers every match.
    async fn export_journal_lines(
        &self,
        client_id: DbId,
        filter: &JournalEntryFilter,
    ) -> StoreResult<Vec<JournalLineExport>> {
        let rows = sqlx::query_as::<_, JournalLineExport>(
            "SELECT e.id AS journal_entry_id,
                    e.entity_id,
                    e.reference_number,
                    e.entry_date,
                    e.status,
                    e.currency,
                    e.description,
                    l.line_no,
                    l.account_id,
                    a.code AS account_code,
                    l.side,
                    l.amount,
                    l.memo
             FROM journal_entry_lines l
             JOIN journal_entries e ON e.id = l.journal_entry_id
             JOIN accounts a ON a.id = l.account_id
             WHERE e.client_id = $1
               AND ($2::BIGINT IS NULL OR e.entity_id = $2)
               AND ($3::TEXT IS NULL OR e.status = $3)
               AND ($4::DATE IS NULL OR e.entry_date >= $4)
               AND ($5::DATE IS NULL OR e.entry_date <= $5)
               AND ($6::TEXT IS NULL OR e.reference_number ILIKE $6 OR e.description ILIKE $6)
             ORDER BY e.entry_date, e.id, l.line_no",
        )
        .bind(client_id)
        .bind(filter.entity_id)
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.from)
        .bind(filter.to)
        .bind(search_pattern(filter.search.as_deref()))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
