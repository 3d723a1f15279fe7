//! Response shapes the client decodes. Unknown fields are ignored, so these
//! carry only what consumers read.

use serde::{Deserialize, Serialize};
use tally_core::attachment::StagingKey;
use tally_core::client_status::ClientDisplayStatus;
use tally_core::journal::JournalStatus;
use tally_core::roles::Role;
use tally_core::types::{DbId, EntryDate, Timestamp};

/// Every successful API body is wrapped as `{"data": ...}`.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: T,
}

/// Error body returned for every non-2xx status.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: String,
    pub code: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct PromoteRequest {
    pub staging_key: StagingKey,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub id: DbId,
    pub username: String,
    pub email: String,
    pub role: Role,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    pub user: UserInfo,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientSummary {
    pub id: DbId,
    pub name: String,
    pub code: String,
    pub is_active: bool,
    pub is_deleted: bool,
    pub status: ClientDisplayStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewClient {
    pub name: String,
    pub code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntitySummary {
    pub id: DbId,
    pub client_id: DbId,
    pub name: String,
    pub code: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JournalEntrySummary {
    pub id: DbId,
    pub client_id: DbId,
    pub entity_id: DbId,
    pub reference_number: Option<String>,
    pub entry_date: EntryDate,
    pub description: String,
    pub currency: String,
    pub status: JournalStatus,
    pub posted_at: Option<Timestamp>,
}

/// Attachment metadata. Staged uploads carry a `staging_key` and no entry.
#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentInfo {
    pub id: DbId,
    pub client_id: DbId,
    pub journal_entry_id: Option<DbId>,
    pub staging_key: Option<StagingKey>,
    pub file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
}
