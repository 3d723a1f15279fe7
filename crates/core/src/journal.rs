//! Journal entry lifecycle and balance rules.
//!
//! An entry moves `draft -> posted -> voided`. Only drafts accept structural
//! edits or attachment changes, posting requires balanced lines, and
//! `voided` is terminal.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Default currency applied when a create request omits one.
pub const DEFAULT_CURRENCY: &str = "USD";

/// Monetary amounts carry at most this many fractional digits.
pub const AMOUNT_SCALE: u32 = 2;

/// Largest line amount: the range of a `NUMERIC(18, 2)` column.
pub const MAX_LINE_AMOUNT: Decimal = Decimal::from_parts(2_808_348_671, 232_830_643, 0, false, 2);

/// Minimum number of lines a postable entry needs.
pub const MIN_POSTABLE_LINES: usize = 2;

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalStatus {
    Draft,
    Posted,
    Voided,
}

impl JournalStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Posted => "posted",
            Self::Voided => "voided",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Voided)
    }
}

impl fmt::Display for JournalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JournalStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "posted" => Ok(Self::Posted),
            "voided" => Ok(Self::Voided),
            other => Err(CoreError::Validation(format!(
                "Invalid journal entry status '{other}'. Must be one of: draft, posted, voided"
            ))),
        }
    }
}

impl TryFrom<String> for JournalStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// Line side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineSide {
    Debit,
    Credit,
}

impl LineSide {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }
}

impl fmt::Display for LineSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LineSide {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debit" => Ok(Self::Debit),
            "credit" => Ok(Self::Credit),
            other => Err(CoreError::Validation(format!(
                "Invalid line side '{other}'. Must be one of: debit, credit"
            ))),
        }
    }
}

impl TryFrom<String> for LineSide {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

// ---------------------------------------------------------------------------
// Totals
// ---------------------------------------------------------------------------

/// Debit and credit sums over a set of lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LineTotals {
    pub debit: Decimal,
    pub credit: Decimal,
}

impl LineTotals {
    /// Fails instead of overflowing when the sums leave the `Decimal` range.
    pub fn from_lines<I>(lines: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = (LineSide, Decimal)>,
    {
        lines
            .into_iter()
            .try_fold(Self::default(), |mut totals, (side, amount)| {
                let slot = match side {
                    LineSide::Debit => &mut totals.debit,
                    LineSide::Credit => &mut totals.credit,
                };
                *slot = slot.checked_add(amount).ok_or_else(|| {
                    CoreError::Validation("Line totals exceed the supported amount range".into())
                })?;
                Ok(totals)
            })
    }

    /// Debits minus credits.
    pub fn difference(&self) -> Decimal {
        self.debit - self.credit
    }

    pub fn is_balanced(&self) -> bool {
        self.difference().is_zero()
    }
}

// ---------------------------------------------------------------------------
// Field validation
// ---------------------------------------------------------------------------

/// Line amounts are strictly positive, at most [`MAX_LINE_AMOUNT`], with at
/// most two decimal places.
pub fn validate_amount(amount: Decimal) -> Result<(), CoreError> {
    if amount <= Decimal::ZERO {
        return Err(CoreError::Validation(format!(
            "Line amount must be greater than zero, got {amount}"
        )));
    }
    if amount > MAX_LINE_AMOUNT {
        return Err(CoreError::Validation(format!(
            "Line amount {amount} exceeds the maximum of {MAX_LINE_AMOUNT}"
        )));
    }
    if amount.normalize().scale() > AMOUNT_SCALE {
        return Err(CoreError::Validation(format!(
            "Line amount {amount} has more than {AMOUNT_SCALE} decimal places"
        )));
    }
    Ok(())
}

/// Currency codes are three upper-case ASCII letters.
pub fn validate_currency(code: &str) -> Result<(), CoreError> {
    if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Invalid currency code '{code}'. Expected three upper-case letters"
        )))
    }
}

/// Entries are always created as drafts. A request asking for anything else
/// is rejected so posting stays a separate, explicit action.
pub fn validate_initial_status(requested: Option<JournalStatus>) -> Result<(), CoreError> {
    match requested {
        None | Some(JournalStatus::Draft) => Ok(()),
        Some(other) => Err(CoreError::Validation(format!(
            "Journal entries are always created as draft (requested '{other}'); \
             create the entry first, then post it"
        ))),
    }
}

// ---------------------------------------------------------------------------
// Lifecycle guards
// ---------------------------------------------------------------------------

/// Header updates, line changes and deletion require a draft.
pub fn ensure_editable(status: JournalStatus) -> Result<(), CoreError> {
    match status {
        JournalStatus::Draft => Ok(()),
        JournalStatus::Posted => Err(CoreError::Validation(
            "Journal entry is posted; only draft entries can be edited".into(),
        )),
        JournalStatus::Voided => Err(CoreError::Validation(
            "Journal entry is voided; no further changes are allowed".into(),
        )),
    }
}

/// Attachments can be added, removed or promoted only while the parent is a
/// draft.
pub fn ensure_attachments_mutable(status: JournalStatus) -> Result<(), CoreError> {
    match status {
        JournalStatus::Draft => Ok(()),
        JournalStatus::Posted => Err(CoreError::Validation(
            "Journal entry is posted; attachments can only change on draft entries".into(),
        )),
        JournalStatus::Voided => Err(CoreError::Validation(
            "Journal entry is voided; attachments can no longer be changed".into(),
        )),
    }
}

/// Check a `draft -> posted` transition against the entry's lines.
pub fn validate_post(
    status: JournalStatus,
    totals: &LineTotals,
    line_count: usize,
) -> Result<(), CoreError> {
    match status {
        JournalStatus::Draft => {}
        JournalStatus::Posted => {
            return Err(CoreError::Validation(
                "Journal entry is posted already".into(),
            ))
        }
        JournalStatus::Voided => {
            return Err(CoreError::Validation(
                "Journal entry is voided and cannot be posted".into(),
            ))
        }
    }

    if line_count < MIN_POSTABLE_LINES {
        return Err(CoreError::Validation(format!(
            "Journal entry needs at least {MIN_POSTABLE_LINES} lines to be posted, has {line_count}"
        )));
    }

    if !totals.is_balanced() {
        return Err(CoreError::Validation(format!(
            "Journal entry is out of balance: debits {}, credits {} (difference {})",
            totals.debit,
            totals.credit,
            totals.difference().abs()
        )));
    }

    if totals.debit.is_zero() {
        return Err(CoreError::Validation(
            "Journal entry totals are zero and cannot be posted".into(),
        ));
    }

    Ok(())
}

/// Check a `posted -> voided` transition.
pub fn validate_void(status: JournalStatus) -> Result<(), CoreError> {
    match status {
        JournalStatus::Posted => Ok(()),
        JournalStatus::Draft => Err(CoreError::Validation(
            "Only posted entries can be voided; delete the draft instead".into(),
        )),
        JournalStatus::Voided => Err(CoreError::Validation(
            "Journal entry is voided already".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn dec(units: i64) -> Decimal {
        Decimal::new(units, 0)
    }

    fn totals(lines: &[(LineSide, i64)]) -> LineTotals {
        LineTotals::from_lines(lines.iter().map(|(side, n)| (*side, dec(*n)))).unwrap()
    }

    #[test]
    fn balanced_draft_posts() {
        let t = totals(&[(LineSide::Debit, 100), (LineSide::Credit, 100)]);
        assert!(validate_post(JournalStatus::Draft, &t, 2).is_ok());
    }

    #[test]
    fn split_lines_balance() {
        let t = totals(&[
            (LineSide::Debit, 60),
            (LineSide::Debit, 40),
            (LineSide::Credit, 100),
        ]);
        assert!(t.is_balanced());
        assert!(validate_post(JournalStatus::Draft, &t, 3).is_ok());
    }

    #[test]
    fn imbalance_message_names_amounts() {
        let t = totals(&[(LineSide::Debit, 100), (LineSide::Credit, 90)]);
        let err = validate_post(JournalStatus::Draft, &t, 2).unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) => {
            assert!(msg.contains("out of balance"));
            assert!(msg.contains("debits 100"));
            assert!(msg.contains("credits 90"));
            assert!(msg.contains("difference 10"));
        });
    }

    #[test]
    fn single_line_cannot_post() {
        let t = totals(&[(LineSide::Debit, 100)]);
        let err = validate_post(JournalStatus::Draft, &t, 1).unwrap_err();
        assert!(err.to_string().contains("at least 2 lines"));
    }

    #[test]
    fn zero_totals_cannot_post() {
        let t = LineTotals::default();
        assert!(validate_post(JournalStatus::Draft, &t, 2).is_err());
    }

    #[test]
    fn posted_and_voided_cannot_post_again() {
        let t = totals(&[(LineSide::Debit, 5), (LineSide::Credit, 5)]);
        assert!(validate_post(JournalStatus::Posted, &t, 2).is_err());
        assert!(validate_post(JournalStatus::Voided, &t, 2).is_err());
    }

    #[test]
    fn only_posted_entries_void() {
        assert!(validate_void(JournalStatus::Posted).is_ok());
        assert!(validate_void(JournalStatus::Draft).is_err());
        assert!(validate_void(JournalStatus::Voided).is_err());
    }

    #[test]
    fn edit_guard_names_status() {
        assert!(ensure_editable(JournalStatus::Draft).is_ok());
        let posted = ensure_editable(JournalStatus::Posted).unwrap_err();
        assert!(posted.to_string().contains("entry is posted"));
        let voided = ensure_editable(JournalStatus::Voided).unwrap_err();
        assert!(voided.to_string().contains("entry is voided"));
    }

    #[test]
    fn attachments_frozen_outside_draft() {
        assert!(ensure_attachments_mutable(JournalStatus::Draft).is_ok());
        assert!(ensure_attachments_mutable(JournalStatus::Posted).is_err());
        assert!(ensure_attachments_mutable(JournalStatus::Voided).is_err());
    }

    #[test]
    fn create_as_posted_rejected() {
        assert!(validate_initial_status(None).is_ok());
        assert!(validate_initial_status(Some(JournalStatus::Draft)).is_ok());
        let err = validate_initial_status(Some(JournalStatus::Posted)).unwrap_err();
        assert!(err.to_string().contains("always created as draft"));
    }

    #[test]
    fn amount_rules() {
        assert!(validate_amount(Decimal::new(10050, 2)).is_ok());
        assert!(validate_amount(Decimal::new(1000, 3)).is_ok());
        assert!(validate_amount(Decimal::ZERO).is_err());
        assert!(validate_amount(Decimal::new(-5, 0)).is_err());
        assert!(validate_amount(Decimal::new(1001, 3)).is_err());
        assert_eq!(MAX_LINE_AMOUNT.to_string(), "9999999999999999.99");
        assert!(validate_amount(MAX_LINE_AMOUNT).is_ok());
        assert!(validate_amount(MAX_LINE_AMOUNT + Decimal::new(1, 2)).is_err());
        assert!(validate_amount(Decimal::MAX).is_err());
    }

    #[test]
    fn totals_report_overflow_instead_of_panicking() {
        let lines = [(LineSide::Debit, Decimal::MAX), (LineSide::Debit, Decimal::MAX)];
        assert_matches!(LineTotals::from_lines(lines), Err(CoreError::Validation(_)));
    }

    #[test]
    fn currency_rules() {
        assert!(validate_currency("USD").is_ok());
        assert!(validate_currency("usd").is_err());
        assert!(validate_currency("EURO").is_err());
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [JournalStatus::Draft, JournalStatus::Posted, JournalStatus::Voided] {
            assert_eq!(status.as_str().parse::<JournalStatus>().unwrap(), status);
        }
        assert!("archived".parse::<JournalStatus>().is_err());
        assert!(JournalStatus::Voided.is_terminal());
    }
}
