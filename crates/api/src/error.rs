use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tally_core::error::{CoreError, FieldError};
use tally_db::StoreError;

/// Error returned by every handler.
///
/// Rendered as `{"error": <message>, "code": <CODE>}`, plus `"errors"` with
/// per-field details when request validation failed.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Logged in full, reported to the caller only as a generic 500.
    #[error("Internal error: {0}")]
    InternalError(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Core(core) => AppError::Core(core),
            StoreError::Database(db) => AppError::Database(db),
            StoreError::Io(io) => AppError::InternalError(format!("File storage error: {io}")),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Core(CoreError::from(errors))
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: String,
    code: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<&'a [FieldError]>,
}

const INTERNAL_MESSAGE: &str = "An internal error occurred";

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        INTERNAL_MESSAGE.to_string(),
    )
}

impl AppError {
    /// Status, machine-readable code and caller-facing message.
    fn classify(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::Core(core) => classify_core_error(core),
            AppError::Database(err) => classify_sqlx_error(err),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone()),
            AppError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                internal()
            }
        }
    }

    fn field_errors(&self) -> Option<&[FieldError]> {
        match self {
            AppError::Core(CoreError::InvalidFields { fields, .. }) => Some(fields),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error) = self.classify();
        let body = ErrorBody {
            error,
            code,
            errors: self.field_errors(),
        };
        (status, Json(body)).into_response()
    }
}

fn classify_core_error(err: &CoreError) -> (StatusCode, &'static str, String) {
    match err {
        CoreError::NotFound { entity, id } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            format!("{entity} with id {id} not found"),
        ),
        CoreError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
        CoreError::InvalidFields { message, .. } => {
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message.clone())
        }
        CoreError::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg.clone()),
        CoreError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
        CoreError::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg.clone()),
        CoreError::Internal(msg) => {
            tracing::error!(error = %msg, "Internal core error");
            internal()
        }
    }
}

/// What a `uq_*` constraint guards, for the 409 message.
fn duplicate_message(constraint: &str) -> String {
    let what = match constraint {
        "uq_clients_code" => "A client with this code",
        "uq_entities_client_code" => "An entity with this code",
        "uq_accounts_client_code" => "An account with this code",
        "uq_journal_entries_client_reference" => "A journal entry with this reference number",
        "uq_users_username" => "A user with this username",
        _ => return format!("Duplicate value violates unique constraint: {constraint}"),
    };
    format!("{what} already exists")
}

/// `RowNotFound` is 404 and unique violations on `uq_*` constraints are 409.
/// Anything else is logged and sanitised to 500.
fn classify_sqlx_error(err: &sqlx::Error) -> (StatusCode, &'static str, String) {
    if let sqlx::Error::RowNotFound = err {
        return (
            StatusCode::NOT_FOUND,
            "NOT_FOUND",
            "Resource not found".to_string(),
        );
    }

    if let sqlx::Error::Database(db_err) = err {
        // 23505: unique_violation
        let constraint = db_err.constraint().filter(|c| c.starts_with("uq_"));
        if let (Some("23505"), Some(constraint)) = (db_err.code().as_deref(), constraint) {
            return (
                StatusCode::CONFLICT,
                "CONFLICT",
                duplicate_message(constraint),
            );
        }
    }

    tracing::error!(error = %err, "Database error");
    internal()
}
