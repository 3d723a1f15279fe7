use serde::Serialize;
use validator::ValidationErrors;

use crate::types::DbId;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub code: String,
    pub message: String,
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Validation failed: {message}")]
    InvalidFields {
        message: String,
        fields: Vec<FieldError>,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: DbId) -> Self {
        Self::NotFound { entity, id }
    }
}

impl From<ValidationErrors> for CoreError {
    /// Flatten `validator` output into a sorted list of [`FieldError`]s.
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<FieldError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                errs.iter().map(move |err| FieldError {
                    field: field.clone(),
                    code: err.code.to_string(),
                    message: err
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{field} is invalid ({})", err.code)),
                })
            })
            .collect();
        fields.sort_by(|a, b| a.field.cmp(&b.field).then(a.code.cmp(&b.code)));

        let mut names: Vec<&str> = fields.iter().map(|f| f.field.as_str()).collect();
        names.dedup();

        CoreError::InvalidFields {
            message: format!("Invalid fields: {}", names.join(", ")),
            fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "name must not be empty"))]
        name: String,
        #[validate(length(equal = 3))]
        currency: String,
    }

    #[test]
    fn validation_errors_become_sorted_field_list() {
        let sample = Sample {
            name: String::new(),
            currency: "EURO".into(),
        };
        let err: CoreError = sample.validate().unwrap_err().into();

        assert_matches!(err, CoreError::InvalidFields { message, fields } => {
            assert_eq!(message, "Invalid fields: currency, name");
            assert_eq!(fields.len(), 2);
            assert_eq!(fields[0].field, "currency");
            assert_eq!(fields[0].code, "length");
            assert_eq!(fields[1].message, "name must not be empty");
        });
    }

    #[test]
    fn not_found_display_names_entity() {
        let err = CoreError::not_found("Client", 7);
        assert_eq!(err.to_string(), "Entity not found: Client with id 7");
    }
}
