//! Chart-of-accounts model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tally_core::chart::{AccountType, ChartItem};
use tally_core::types::{DbId, Timestamp};
use validator::Validate;

use super::double_option;

/// A row from the `accounts` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Account {
    pub id: DbId,
    pub client_id: DbId,
    pub parent_id: Option<DbId>,
    pub code: String,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub account_type: AccountType,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ChartItem for Account {
    fn id(&self) -> DbId {
        self.id
    }

    fn parent_id(&self) -> Option<DbId> {
        self.parent_id
    }

    fn code(&self) -> &str {
        &self.code
    }
}

/// DTO for creating an account.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAccount {
    #[validate(length(min = 1, max = 32))]
    pub code: String,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub account_type: AccountType,
    pub parent_id: Option<DbId>,
}

/// DTO for updating an account.
///
/// `parent_id` distinguishes "leave unchanged" (absent) from "detach"
/// (`null`).
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateAccount {
    #[validate(length(min = 1, max = 32))]
    pub code: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub account_type: Option<AccountType>,
    #[serde(default, deserialize_with = "double_option")]
    pub parent_id: Option<Option<DbId>>,
    pub is_active: Option<bool>,
}
