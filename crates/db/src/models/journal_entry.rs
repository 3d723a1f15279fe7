//! Journal entry and line models and DTOs.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tally_core::error::CoreError;
use tally_core::journal::{
    validate_amount, validate_currency, validate_initial_status, JournalStatus, LineSide,
    LineTotals, DEFAULT_CURRENCY,
};
use tally_core::types::{DbId, Timestamp};
use validator::Validate;

/// Addresses one journal entry through its client and entity scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryRef {
    pub client_id: DbId,
    pub entity_id: DbId,
    pub id: DbId,
}

/// A row from the `journal_entries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct JournalEntry {
    pub id: DbId,
    pub client_id: DbId,
    pub entity_id: DbId,
    pub reference_number: Option<String>,
    pub entry_date: NaiveDate,
    pub description: String,
    pub currency: String,
    #[sqlx(try_from = "String")]
    pub status: JournalStatus,
    pub created_by: DbId,
    pub posted_at: Option<Timestamp>,
    pub posted_by: Option<DbId>,
    pub voided_at: Option<Timestamp>,
    pub voided_by: Option<DbId>,
    pub void_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl JournalEntry {
    pub fn matches_ref(&self, entry: EntryRef) -> bool {
        self.id == entry.id && self.client_id == entry.client_id && self.entity_id == entry.entity_id
    }
}

/// A row from the `journal_entry_lines` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct JournalLine {
    pub id: DbId,
    pub journal_entry_id: DbId,
    pub line_no: i32,
    pub account_id: DbId,
    #[sqlx(try_from = "String")]
    pub side: LineSide,
    pub amount: Decimal,
    pub memo: Option<String>,
    pub created_at: Timestamp,
}

/// An entry together with its lines and their totals.
#[derive(Debug, Clone, Serialize)]
pub struct JournalEntryWithLines {
    #[serde(flatten)]
    pub entry: JournalEntry,
    pub lines: Vec<JournalLine>,
    pub totals: LineTotals,
}

impl JournalEntryWithLines {
    pub fn new(entry: JournalEntry, mut lines: Vec<JournalLine>) -> Result<Self, CoreError> {
        lines.sort_by_key(|l| (l.line_no, l.id));
        let totals = LineTotals::from_lines(lines.iter().map(|l| (l.side, l.amount)))?;
        Ok(Self {
            entry,
            lines,
            totals,
        })
    }
}

/// DTO for one line of a new or existing entry.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateJournalLine {
    pub account_id: DbId,
    pub side: LineSide,
    pub amount: Decimal,
    #[validate(length(max = 500))]
    pub memo: Option<String>,
}

impl CreateJournalLine {
    pub fn check_rules(&self) -> Result<(), CoreError> {
        validate_amount(self.amount)
    }
}

/// DTO for creating a journal entry with its lines.
///
/// `status` is accepted only so a request asking for anything other than
/// `draft` can be rejected with a clear message.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateJournalEntry {
    #[validate(length(min = 1, max = 64))]
    pub reference_number: Option<String>,
    pub entry_date: NaiveDate,
    #[validate(length(min = 1, max = 1000))]
    pub description: String,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
    pub status: Option<JournalStatus>,
    #[serde(default)]
    #[validate(nested)]
    pub lines: Vec<CreateJournalLine>,
}

impl CreateJournalEntry {
    /// Domain checks beyond field validation. Returns the currency to store.
    pub fn check_rules(&self) -> Result<String, CoreError> {
        validate_initial_status(self.status)?;
        let currency = self
            .currency
            .clone()
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        validate_currency(&currency)?;
        for line in &self.lines {
            line.check_rules()?;
        }
        Ok(currency)
    }
}

/// DTO for updating a draft entry's header. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateJournalEntry {
    #[validate(length(min = 1, max = 64))]
    pub reference_number: Option<String>,
    pub entry_date: Option<NaiveDate>,
    #[validate(length(min = 1, max = 1000))]
    pub description: Option<String>,
    #[validate(length(equal = 3))]
    pub currency: Option<String>,
}

impl UpdateJournalEntry {
    pub fn check_rules(&self) -> Result<(), CoreError> {
        match &self.currency {
            Some(currency) => validate_currency(currency),
            None => Ok(()),
        }
    }
}

/// Body of `POST .../void`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct VoidJournalEntry {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
}
