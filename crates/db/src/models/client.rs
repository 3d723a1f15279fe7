//! Client (accounting organisation) model and DTOs.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use tally_core::client_status::{display_status, ClientDisplayStatus};
use tally_core::types::{DbId, Timestamp};
use validator::Validate;

/// A row from the `clients` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Client {
    pub id: DbId,
    pub name: String,
    pub code: String,
    pub is_active: bool,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Client {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn display_status(&self) -> ClientDisplayStatus {
        display_status(self.is_active, self.is_deleted())
    }
}

/// Client as returned by the API, with the derived display status.
#[derive(Debug, Clone, Serialize)]
pub struct ClientResponse {
    #[serde(flatten)]
    pub client: Client,
    pub is_deleted: bool,
    pub status: ClientDisplayStatus,
}

impl From<Client> for ClientResponse {
    fn from(client: Client) -> Self {
        Self {
            is_deleted: client.is_deleted(),
            status: client.display_status(),
            client,
        }
    }
}

/// DTO for creating a client.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateClient {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(min = 1, max = 32))]
    pub code: String,
    /// Defaults to `true` if omitted.
    pub is_active: Option<bool>,
}

/// DTO for updating a client. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateClient {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 32))]
    pub code: Option<String>,
    pub is_active: Option<bool>,
}
