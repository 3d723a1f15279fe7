//! Display status of a client record.
//!
//! Soft deletion and activation are tracked independently; the display
//! status composes them with deletion taking precedence.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientDisplayStatus {
    Active,
    Inactive,
    Deleted,
}

impl ClientDisplayStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Deleted => "deleted",
        }
    }
}

/// Derive the display status from the two orthogonal flags.
pub fn display_status(is_active: bool, is_deleted: bool) -> ClientDisplayStatus {
    if is_deleted {
        ClientDisplayStatus::Deleted
    } else if is_active {
        ClientDisplayStatus::Active
    } else {
        ClientDisplayStatus::Inactive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deleted_wins_over_active_flag() {
        assert_eq!(display_status(true, true), ClientDisplayStatus::Deleted);
        assert_eq!(display_status(false, true), ClientDisplayStatus::Deleted);
    }

    #[test]
    fn live_clients_follow_active_flag() {
        assert_eq!(display_status(true, false), ClientDisplayStatus::Active);
        assert_eq!(display_status(false, false), ClientDisplayStatus::Inactive);
    }

    #[test]
    fn serializes_lowercase() {
        let json = serde_json::to_string(&ClientDisplayStatus::Inactive).unwrap();
        assert_eq!(json, "\"inactive\"");
    }
}
