/// Field-level validation for create and update shapes
///
/// Shapes derive [`validator::Validate`] for length, range and regex rules.
/// This module holds the shared regexes and custom rules, plus two entry
/// points:
///
/// - [`validated`]: run the declared rules on an already-typed shape
/// - [`from_json`]: decode a raw JSON body into a shape, reporting missing
///   required fields and unknown enum members per field before running the
///   declared rules
///
/// # Example
///
/// ```
/// use castwright_shared::models::task::CreateTask;
/// use castwright_shared::validation::from_json;
/// use serde_json::json;
///
/// let err = from_json::<CreateTask>(json!({ "title": "" })).unwrap_err();
/// let violations = err.violations().unwrap();
/// assert_eq!(violations[0].field, "title");
/// assert_eq!(violations[0].rule, "length");
/// ```

use crate::error::{FieldViolation, SchemaError, SchemaResult};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError};

/// `local@domain.tld` shape accepted for user emails
pub static EMAIL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("valid email regex")
});

/// Usernames: letters, digits, underscore and dash
pub static USERNAME_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("valid username regex"));

/// ISO 4217 style currency code
pub static CURRENCY_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]{3}$").expect("valid currency regex"));

/// Maximum number of tags on a project or topic
pub const MAX_TAGS: usize = 20;

/// Maximum length of a single tag
pub const MAX_TAG_LENGTH: usize = 50;

/// A shape that can be decoded from an untrusted JSON body
pub trait Payload: DeserializeOwned + Validate {
    /// Fields restricted to a closed set of string values
    const ENUM_FIELDS: &'static [(&'static str, &'static [&'static str])] = &[];
}

/// Runs the declared field rules on a shape
///
/// Returns the shape unchanged when every rule passes, otherwise a
/// [`SchemaError::Validation`] listing each violated rule per field.
pub fn validated<T: Validate>(value: T) -> SchemaResult<T> {
    value.validate()?;
    Ok(value)
}

/// Decodes and validates a JSON body
///
/// Declared defaults are applied for absent optional fields.
pub fn from_json<T: Payload>(value: serde_json::Value) -> SchemaResult<T> {
    let Some(object) = value.as_object() else {
        return Err(SchemaError::violation(
            "body",
            "type",
            "Request body must be a JSON object",
        ));
    };

    let mut violations = Vec::new();
    for (field, allowed) in T::ENUM_FIELDS {
        match object.get(*field) {
            None | Some(serde_json::Value::Null) => {}
            Some(serde_json::Value::String(s)) if allowed.contains(&s.as_str()) => {}
            Some(_) => violations.push(FieldViolation::new(
                *field,
                "enum",
                format!("Must be one of: {}", allowed.join(", ")),
            )),
        }
    }
    if !violations.is_empty() {
        return Err(SchemaError::Validation(violations));
    }

    let decoded = serde_json::from_value::<T>(value).map_err(decode_violation)?;
    validated(decoded)
}

fn decode_violation(err: serde_json::Error) -> SchemaError {
    let message = err.to_string();

    if let Some(rest) = message.strip_prefix("missing field `") {
        if let Some(field) = rest.split('`').next() {
            return SchemaError::violation(field, "required", "Field is required");
        }
    }

    SchemaError::violation("body", "type", message)
}

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Tags must be non-blank, at most 50 characters, at most 20 entries
pub fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    if tags.len() > MAX_TAGS {
        return Err(error("length", "At most 20 tags are allowed"));
    }
    if tags
        .iter()
        .any(|t| t.trim().is_empty() || t.chars().count() > MAX_TAG_LENGTH)
    {
        return Err(error("length", "Each tag must be 1-50 characters"));
    }
    Ok(())
}

/// Checks that `value` fits a `NUMERIC(precision, scale)` column unrounded
///
/// Fails with `scale` for too many decimal places (Postgres would round them
/// away) and `range` for too many integer digits.
pub fn check_numeric(value: &Decimal, precision: u32, scale: u32) -> Result<(), ValidationError> {
    if value.normalize().scale() > scale {
        return Err(owned_error(
            "scale",
            format!("At most {} decimal places are allowed", scale),
        ));
    }

    let integer_part = value.abs().trunc();
    let integer_digits = if integer_part.is_zero() {
        0
    } else {
        integer_part.normalize().to_string().len() as u32
    };
    if integer_digits > precision - scale {
        return Err(owned_error(
            "range",
            format!("At most {} digits before the decimal point", precision - scale),
        ));
    }

    Ok(())
}

fn owned_error(code: &'static str, message: String) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Speed and pitch multipliers: 0.50 to 2.00 inclusive, `NUMERIC(3, 2)`
pub fn validate_multiplier(value: &Decimal) -> Result<(), ValidationError> {
    check_numeric(value, 3, 2)?;
    if *value < Decimal::new(50, 2) || *value > Decimal::new(200, 2) {
        return Err(error("range", "Must be between 0.50 and 2.00"));
    }
    Ok(())
}

/// Money and minute totals, `NUMERIC(10, 2)`, never negative
pub fn validate_amount(value: &Decimal) -> Result<(), ValidationError> {
    check_numeric(value, 10, 2)?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(error("range", "Must not be negative"));
    }
    Ok(())
}

/// Estimated running time in minutes, `NUMERIC(6, 2)`, never negative
pub fn validate_duration_minutes(value: &Decimal) -> Result<(), ValidationError> {
    check_numeric(value, 6, 2)?;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(error("range", "Must not be negative"));
    }
    Ok(())
}

/// Requested running time in minutes, `NUMERIC(6, 2)`, above zero
pub fn validate_target_minutes(value: &Decimal) -> Result<(), ValidationError> {
    check_numeric(value, 6, 2)?;
    if *value <= Decimal::ZERO {
        return Err(error("range", "Must be greater than zero"));
    }
    Ok(())
}

/// Popularity scores are percentages, `NUMERIC(5, 2)`
pub fn validate_popularity(value: &Decimal) -> Result<(), ValidationError> {
    check_numeric(value, 5, 2)?;
    if *value < Decimal::ZERO || *value > Decimal::ONE_HUNDRED {
        return Err(error("range", "Must be between 0 and 100"));
    }
    Ok(())
}

/// Rejects strings made only of whitespace
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(error("blank", "Must not be blank"));
    }
    Ok(())
}
