//! Input validation helpers
//!
//! Public request DTOs derive [`validator::Validate`]; admin payloads from
//! `shared::models` are checked with the text helpers below.

use shared::error::AppError;
use validator::{Validate, ValidationErrors};

// ── Text length limits ──────────────────────────────────────────────

/// Names: people, companies, ticket types
pub const MAX_NAME_LEN: usize = 200;

/// Descriptions, panel interest messages
pub const MAX_NOTE_LEN: usize = 2000;

/// Short identifiers: phone, coupon code, username
pub const MAX_SHORT_TEXT_LEN: usize = 100;

/// Email addresses (RFC 5321)
pub const MAX_EMAIL_LEN: usize = 254;

/// Passwords (before hashing)
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_PASSWORD_LEN: usize = 128;

/// Hard cap on tickets per registration, regardless of ticket type settings
pub const MAX_QUANTITY: i32 = 50;

// ── Validation helpers ──────────────────────────────────────────────

/// Run derived validation and convert failures into a `ValidationFailed`
/// error with one detail entry per offending field.
pub fn validate_request<T: Validate>(req: &T) -> Result<(), AppError> {
    req.validate().map_err(validation_error)
}

fn validation_error(errors: ValidationErrors) -> AppError {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    let summary = fields
        .iter()
        .map(|(field, _)| field.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    let mut err = AppError::validation(format!("Invalid fields: {summary}"));
    for (field, errs) in fields {
        let messages: Vec<String> = errs
            .iter()
            .map(|e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string())
            })
            .collect();
        err = err.with_detail(field.to_string(), messages.join("; "));
    }
    err
}

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    if value.len() > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        )));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value
        && v.len() > max_len
    {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.len()
        )));
    }
    Ok(())
}

/// Validate a password before hashing.
pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "password is too long (max {MAX_PASSWORD_LEN})"
        )));
    }
    Ok(())
}

/// Clamp list pagination parameters to sane bounds.
pub fn page_bounds(limit: Option<i64>, offset: Option<i64>) -> (i64, i64) {
    (limit.unwrap_or(50).clamp(1, 200), offset.unwrap_or(0).max(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::error::ErrorCode;

    #[derive(Validate)]
    struct Signup {
        #[validate(email)]
        email: String,
        #[validate(length(min = 1, max = 5, message = "name must be 1-5 chars"))]
        name: String,
    }

    #[test]
    fn derived_validation_reports_each_field() {
        let req = Signup {
            email: "not-an-email".to_string(),
            name: "far too long".to_string(),
        };
        let err = validate_request(&req).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert_eq!(err.message, "Invalid fields: email, name");

        let details = err.details.unwrap();
        assert_eq!(details.get("email").unwrap(), "email");
        assert_eq!(details.get("name").unwrap(), "name must be 1-5 chars");
    }

    #[test]
    fn derived_validation_accepts_valid_input() {
        let req = Signup {
            email: "visitor@example.com".to_string(),
            name: "Ana".to_string(),
        };
        assert!(validate_request(&req).is_ok());
    }

    #[test]
    fn required_text_rejects_blank() {
        assert!(validate_required_text("   ", "name", 10).is_err());
        assert!(validate_required_text("Expo Pass", "name", 10).is_ok());
        assert!(validate_required_text("Expo Pass Plus", "name", 10).is_err());
    }

    #[test]
    fn optional_text_checks_length_only_when_present() {
        assert!(validate_optional_text(&None, "phone", 3).is_ok());
        assert!(validate_optional_text(&Some("1234".to_string()), "phone", 3).is_err());
    }

    #[test]
    fn password_length_bounds() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long-enough").is_ok());
        assert!(validate_password(&"x".repeat(MAX_PASSWORD_LEN + 1)).is_err());
    }

    #[test]
    fn page_bounds_clamped() {
        assert_eq!(page_bounds(None, None), (50, 0));
        assert_eq!(page_bounds(Some(10_000), Some(-4)), (200, 0));
        assert_eq!(page_bounds(Some(0), Some(20)), (1, 20));
    }
}
