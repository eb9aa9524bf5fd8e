/// Error type shared by the schema catalog
///
/// Every fallible operation in this crate returns [`SchemaError`]. Validation
/// failures are reported per field so callers can surface them directly;
/// database failures are classified by the constraint that fired.
///
/// # Example
///
/// ```
/// use castwright_shared::error::{FieldViolation, SchemaError};
///
/// let err = SchemaError::Validation(vec![FieldViolation::new(
///     "title",
///     "length",
///     "Title must be 1-200 characters",
/// )]);
/// assert_eq!(err.to_string(), "Validation failed: 1 violation(s)");
/// ```

use serde::{Deserialize, Serialize};
use validator::{ValidationErrors, ValidationErrorsKind};

/// Result alias used throughout the crate
pub type SchemaResult<T> = Result<T, SchemaError>;

/// A single violated field constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// Field that failed validation (nested fields are dotted, e.g. `tags[1]`)
    pub field: String,

    /// Rule that was violated (`length`, `regex`, `range`, `enum`, `required`, ...)
    pub rule: String,

    /// Human-readable message
    pub message: String,
}

impl FieldViolation {
    pub fn new(
        field: impl Into<String>,
        rule: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            rule: rule.into(),
            message: message.into(),
        }
    }
}

/// Errors produced by validation and data access
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// One or more field constraints were violated
    #[error("Validation failed: {} violation(s)", .0.len())]
    Validation(Vec<FieldViolation>),

    /// A unique constraint rejected the write
    #[error("Conflict: {field} already exists")]
    Conflict { field: String },

    /// A foreign key points at a row that does not exist
    #[error("Referenced {field} does not exist")]
    MissingReference { field: String },

    /// A status change not allowed by the entity's state machine
    #[error("Invalid {entity} status transition: {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        from: &'static str,
        to: &'static str,
    },

    /// The row addressed by an update does not exist
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl SchemaError {
    /// Shorthand for a single-violation validation error
    pub fn violation(
        field: impl Into<String>,
        rule: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        SchemaError::Validation(vec![FieldViolation::new(field, rule, message)])
    }

    /// Returns the violations if this is a validation error
    pub fn violations(&self) -> Option<&[FieldViolation]> {
        match self {
            SchemaError::Validation(v) => Some(v),
            _ => None,
        }
    }
}

/// Maps constraint names from the migrations onto the field they guard
const CONSTRAINT_FIELDS: &[(&str, &str)] = &[
    ("tasks_title_length", "title"),
    ("users_email_key", "email"),
    ("users_username_key", "username"),
    ("users_email_format", "email"),
    ("users_username_format", "username"),
    ("users_tier_check", "tier"),
    ("topic_suggestions_popularity_check", "popularity_score"),
    ("projects_status_check", "status"),
    ("projects_voice_type_check", "voice_type"),
    ("scripts_project_version_key", "version"),
    ("scripts_one_current_per_project", "is_current"),
    ("scripts_content_length", "content"),
    ("scripts_status_check", "status"),
    ("audio_files_not_own_original", "original_file_id"),
    ("audio_files_speed_check", "speed"),
    ("audio_files_pitch_check", "pitch"),
    ("audio_files_status_check", "status"),
    ("subscriptions_currency_check", "currency"),
    ("subscriptions_price_check", "price_monthly"),
    ("projects_user_id_fkey", "user_id"),
    ("projects_topic_suggestion_id_fkey", "topic_suggestion_id"),
    ("scripts_project_id_fkey", "project_id"),
    ("audio_files_project_id_fkey", "project_id"),
    ("audio_files_script_id_fkey", "script_id"),
    ("audio_files_original_file_id_fkey", "original_file_id"),
    ("subscriptions_user_id_fkey", "user_id"),
    ("usage_logs_user_id_fkey", "user_id"),
];

fn constraint_field(constraint: &str) -> String {
    CONSTRAINT_FIELDS
        .iter()
        .find(|(name, _)| *name == constraint)
        .map(|(_, field)| field.to_string())
        .unwrap_or_else(|| constraint.to_string())
}

impl From<sqlx::Error> for SchemaError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if let Some(constraint) = db_err.constraint() {
                let field = constraint_field(constraint);

                if db_err.is_unique_violation() {
                    return SchemaError::Conflict { field };
                }
                if db_err.is_foreign_key_violation() {
                    return SchemaError::MissingReference { field };
                }
                if db_err.is_check_violation() {
                    let message = format!("Violates constraint {}", constraint);
                    return SchemaError::violation(field, "check", message);
                }
            }
        }

        SchemaError::Database(err)
    }
}

/// Flattens validator output into per-field violations
///
/// Nested struct errors are prefixed with the parent field name and list
/// entries with their index.
impl From<ValidationErrors> for SchemaError {
    fn from(errors: ValidationErrors) -> Self {
        let mut violations = Vec::new();
        collect_violations(None, &errors, &mut violations);
        violations.sort_by(|a, b| a.field.cmp(&b.field));
        SchemaError::Validation(violations)
    }
}

fn collect_violations(
    prefix: Option<&str>,
    errors: &ValidationErrors,
    out: &mut Vec<FieldViolation>,
) {
    for (field, kind) in errors.errors() {
        let path = match prefix {
            Some(p) => format!("{}.{}", p, field),
            None => field.to_string(),
        };

        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for error in field_errors {
                    let message = error
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Failed {} validation", error.code));
                    out.push(FieldViolation::new(path.clone(), error.code.to_string(), message));
                }
            }
            ValidationErrorsKind::Struct(nested) => collect_violations(Some(&path), nested, out),
            ValidationErrorsKind::List(items) => {
                for (index, nested) in items {
                    let item_path = format!("{}[{}]", path, index);
                    collect_violations(Some(&item_path), nested, out);
                }
            }
        }
    }
}
