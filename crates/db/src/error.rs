use tally_core::error::CoreError;

/// Error returned by every storage module.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A domain rule rejected the operation.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A database error from sqlx.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// File content could not be read or written.
    #[error("File storage error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

impl StoreError {
    pub fn not_found(entity: &'static str, id: tally_core::types::DbId) -> Self {
        StoreError::Core(CoreError::not_found(entity, id))
    }

    pub fn validation(message: impl Into<String>) -> Self {
        StoreError::Core(CoreError::Validation(message.into()))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        StoreError::Core(CoreError::Conflict(message.into()))
    }
}
