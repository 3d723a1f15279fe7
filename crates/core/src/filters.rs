//! Journal entry list filters.
//!
//! Query strings arrive as loose text; [`JournalFilterParams::parse`] turns
//! them into a checked [`JournalEntryFilter`] or a validation error naming
//! the offending parameter.

use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::{CoreError, FieldError};
use crate::journal::JournalStatus;
use crate::types::DbId;

pub const DEFAULT_LIMIT: i64 = 50;
pub const MAX_LIMIT: i64 = 500;
pub const MAX_SEARCH_LEN: usize = 200;

/// Raw query parameters for entry listing and export.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct JournalFilterParams {
    pub entity_id: Option<DbId>,
    pub status: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Validated filter handed to the storage layer.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct JournalEntryFilter {
    pub entity_id: Option<DbId>,
    pub status: Option<JournalStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl JournalEntryFilter {
    /// Whether an entry with these attributes passes the filter.
    ///
    /// Used by backends that filter in process; the Postgres backend
    /// expresses the same predicate in SQL.
    pub fn matches(
        &self,
        entity_id: DbId,
        status: JournalStatus,
        entry_date: NaiveDate,
        reference: Option<&str>,
        description: &str,
    ) -> bool {
        if self.entity_id.is_some_and(|id| id != entity_id) {
            return false;
        }
        if self.status.is_some_and(|s| s != status) {
            return false;
        }
        if self.from.is_some_and(|from| entry_date < from) {
            return false;
        }
        if self.to.is_some_and(|to| entry_date > to) {
            return false;
        }
        if let Some(needle) = &self.search {
            let needle = needle.to_lowercase();
            let in_reference = reference.is_some_and(|r| r.to_lowercase().contains(&needle));
            if !in_reference && !description.to_lowercase().contains(&needle) {
                return false;
            }
        }
        true
    }
}

impl JournalFilterParams {
    pub fn parse(self) -> Result<JournalEntryFilter, CoreError> {
        let mut errors = Vec::new();

        let status = match self.status.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => match raw.parse::<JournalStatus>() {
                Ok(s) => Some(s),
                Err(e) => {
                    errors.push(field_error("status", "invalid_status", e));
                    None
                }
            },
        };

        let from = parse_date("from", self.from.as_deref(), &mut errors);
        let to = parse_date("to", self.to.as_deref(), &mut errors);
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                errors.push(FieldError {
                    field: "from".into(),
                    code: "range".into(),
                    message: format!("'from' ({from}) must not be after 'to' ({to})"),
                });
            }
        }

        let search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        if search.as_ref().is_some_and(|s| s.len() > MAX_SEARCH_LEN) {
            errors.push(FieldError {
                field: "search".into(),
                code: "length".into(),
                message: format!("search must be at most {MAX_SEARCH_LEN} characters"),
            });
        }

        if self.limit.is_some_and(|l| l < 1) {
            errors.push(FieldError {
                field: "limit".into(),
                code: "range".into(),
                message: "limit must be at least 1".into(),
            });
        }
        if self.offset.is_some_and(|o| o < 0) {
            errors.push(FieldError {
                field: "offset".into(),
                code: "range".into(),
                message: "offset must not be negative".into(),
            });
        }

        if !errors.is_empty() {
            let names: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
            return Err(CoreError::InvalidFields {
                message: format!("Invalid filter parameters: {}", names.join(", ")),
                fields: errors,
            });
        }

        Ok(JournalEntryFilter {
            entity_id: self.entity_id,
            status,
            from,
            to,
            search,
            limit: self.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT),
            offset: self.offset.unwrap_or(0),
        })
    }
}

fn parse_date(field: &str, raw: Option<&str>, errors: &mut Vec<FieldError>) -> Option<NaiveDate> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty())?;
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) => Some(date),
        Err(_) => {
            errors.push(FieldError {
                field: field.into(),
                code: "invalid_date".into(),
                message: format!("{field} must be a date in YYYY-MM-DD format, got '{raw}'"),
            });
            None
        }
    }
}

fn field_error(field: &str, code: &str, err: CoreError) -> FieldError {
    let message = match err {
        CoreError::Validation(msg) => msg,
        other => other.to_string(),
    };
    FieldError {
        field: field.into(),
        code: code.into(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn empty_params_use_defaults() {
        let filter = JournalFilterParams::default().parse().unwrap();
        assert_eq!(filter.limit, DEFAULT_LIMIT);
        assert_eq!(filter.offset, 0);
        assert!(filter.status.is_none());
    }

    #[test]
    fn valid_params_parse() {
        let filter = JournalFilterParams {
            status: Some("posted".into()),
            from: Some("2026-01-01".into()),
            to: Some("2026-01-31".into()),
            search: Some("  rent ".into()),
            limit: Some(10_000),
            ..Default::default()
        }
        .parse()
        .unwrap();
        assert_eq!(filter.status, Some(JournalStatus::Posted));
        assert_eq!(filter.from, Some(date("2026-01-01")));
        assert_eq!(filter.search.as_deref(), Some("rent"));
        assert_eq!(filter.limit, MAX_LIMIT);
    }

    #[test]
    fn malformed_params_reported_per_field() {
        let err = JournalFilterParams {
            status: Some("archived".into()),
            from: Some("01/02/2026".into()),
            offset: Some(-1),
            ..Default::default()
        }
        .parse()
        .unwrap_err();

        assert_matches!(err, CoreError::InvalidFields { fields, .. } => {
            let names: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();
            assert_eq!(names, ["status", "from", "offset"]);
        });
    }

    #[test]
    fn inverted_range_rejected() {
        let err = JournalFilterParams {
            from: Some("2026-02-01".into()),
            to: Some("2026-01-01".into()),
            ..Default::default()
        }
        .parse()
        .unwrap_err();
        assert!(err.to_string().contains("from"));
    }

    #[test]
    fn matches_applies_every_criterion() {
        let filter = JournalEntryFilter {
            entity_id: Some(1),
            status: Some(JournalStatus::Draft),
            from: Some(date("2026-01-01")),
            to: Some(date("2026-01-31")),
            search: Some("RENT".into()),
            limit: 50,
            offset: 0,
        };
        let d = date("2026-01-15");
        assert!(filter.matches(1, JournalStatus::Draft, d, None, "January rent"));
        assert!(filter.matches(1, JournalStatus::Draft, d, Some("rent-01"), "other"));
        assert!(!filter.matches(2, JournalStatus::Draft, d, None, "January rent"));
        assert!(!filter.matches(1, JournalStatus::Posted, d, None, "January rent"));
        assert!(!filter.matches(1, JournalStatus::Draft, date("2026-02-01"), None, "rent"));
        assert!(!filter.matches(1, JournalStatus::Draft, d, None, "utilities"));
    }
}
