//! Well-known roles.
//!
//! Role names are stored as text on the `users` table and embedded in
//! access-token claims.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_ACCOUNTANT: &str = "accountant";
pub const ROLE_VIEWER: &str = "viewer";

pub const VALID_ROLES: &[&str] = &[ROLE_ADMIN, ROLE_ACCOUNTANT, ROLE_VIEWER];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Accountant,
    Viewer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => ROLE_ADMIN,
            Role::Accountant => ROLE_ACCOUNTANT,
            Role::Viewer => ROLE_VIEWER,
        }
    }

    /// Privileged callers may post and void journal entries.
    pub fn is_privileged(self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Whether the role may change records at all.
    pub fn can_write(self) -> bool {
        !matches!(self, Role::Viewer)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ROLE_ADMIN => Ok(Role::Admin),
            ROLE_ACCOUNTANT => Ok(Role::Accountant),
            ROLE_VIEWER => Ok(Role::Viewer),
            other => Err(CoreError::Validation(format!(
                "Invalid role '{other}'. Must be one of: {}",
                VALID_ROLES.join(", ")
            ))),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
