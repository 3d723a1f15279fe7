//! Attachment upload rules and staging keys.
//!
//! Files attached while an entry is still being composed are keyed by a
//! client-generated UUID (the staging key). Once the entry is saved the
//! caller promotes every staged file to the permanent entry id.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::types::DbId;

/// Default maximum upload size (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Maximum length of a stored file name.
pub const MAX_FILE_NAME_LEN: usize = 200;

/// Content types accepted for attachments.
pub const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "application/pdf",
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
    "text/csv",
    "text/plain",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// Client-generated identifier grouping uploads for an unsaved entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StagingKey(pub Uuid);

impl StagingKey {
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for StagingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for StagingKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(StagingKey).map_err(|_| {
            CoreError::Validation(format!("Invalid staging key '{s}'. Expected a UUID"))
        })
    }
}

/// Where an attachment currently hangs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentOwner {
    Entry(DbId),
    Staged(StagingKey),
}

/// Reduce an uploaded file name to its final path component with only
/// portable characters, truncated to [`MAX_FILE_NAME_LEN`].
pub fn sanitize_file_name(raw: &str) -> Result<String, CoreError> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or("").trim();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILE_NAME_LEN)
        .collect();

    let cleaned = cleaned.trim_start_matches('.').trim().to_string();
    if cleaned.is_empty() {
        return Err(CoreError::Validation(format!(
            "File name '{raw}' is empty after sanitising"
        )));
    }
    Ok(cleaned)
}

/// Normalise and check a declared content type.
pub fn validate_content_type(content_type: &str) -> Result<String, CoreError> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    if ALLOWED_CONTENT_TYPES.contains(&essence.as_str()) {
        Ok(essence)
    } else {
        Err(CoreError::Validation(format!(
            "Unsupported attachment type '{content_type}'"
        )))
    }
}

/// Uploads must be non-empty and within `max_bytes`.
pub fn validate_size(size: u64, max_bytes: u64) -> Result<(), CoreError> {
    if size == 0 {
        return Err(CoreError::Validation("Uploaded file is empty".into()));
    }
    if size > max_bytes {
        return Err(CoreError::Validation(format!(
            "Uploaded file is {size} bytes; the limit is {max_bytes} bytes"
        )));
    }
    Ok(())
}

/// Storage key for a new upload. Keys never reuse caller-supplied names.
pub fn new_storage_key(client_id: DbId) -> String {
    format!("clients/{client_id}/{}", Uuid::new_v4())
}
