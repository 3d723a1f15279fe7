//! Read models for reporting queries.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use tally_core::chart::AccountType;
use tally_core::journal::{JournalStatus, LineSide};
use tally_core::types::DbId;

/// Per-account totals over posted entries.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AccountBalance {
    pub account_id: DbId,
    pub account_code: String,
    pub account_name: String,
    #[sqlx(try_from = "String")]
    pub account_type: AccountType,
    pub debit_total: Decimal,
    pub credit_total: Decimal,
    /// Debits minus credits.
    pub net: Decimal,
}

/// One journal line flattened with its entry header, for export.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct JournalLineExport {
    pub journal_entry_id: DbId,
    pub entity_id: DbId,
    pub reference_number: Option<String>,
    pub entry_date: NaiveDate,
    #[sqlx(try_from = "String")]
    pub status: JournalStatus,
    pub currency: String,
    pub description: String,
    pub line_no: i32,
    pub account_id: DbId,
    pub account_code: String,
    #[sqlx(try_from = "String")]
    pub side: LineSide,
    pub amount: Decimal,
    pub memo: Option<String>,
}
