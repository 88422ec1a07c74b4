//! `AppError` and the JSON error body

use super::category::ErrorCategory;
use super::codes::ErrorCode;
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use thiserror::Error;

/// Error returned by every handler.
///
/// `code` picks the HTTP status, `message` is safe to show to the visitor or
/// door staff, `details` carries field errors or scan context such as
/// `checked_in_at`.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Option<HashMap<String, Value>>,
}

impl AppError {
    /// Error with the code's default message
    pub fn new(code: ErrorCode) -> Self {
        Self {
            message: code.message().to_string(),
            code,
            details: None,
        }
    }

    pub fn with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn http_status(&self) -> StatusCode {
        self.code.http_status()
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::ValidationFailed, msg)
    }

    pub fn not_authenticated() -> Self {
        Self::new(ErrorCode::NotAuthenticated)
    }

    pub fn invalid_token(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::TokenInvalid, msg)
    }

    pub fn token_expired() -> Self {
        Self::new(ErrorCode::TokenExpired)
    }

    pub fn too_many_requests() -> Self {
        Self::new(ErrorCode::TooManyRequests)
    }

    /// Server-side failure; the message is logged, not sent
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_message(ErrorCode::InternalError, msg)
    }
}

impl From<ErrorCode> for AppError {
    fn from(code: ErrorCode) -> Self {
        Self::new(code)
    }
}

/// Raw database errors are logged and reported as `DatabaseError`.
#[cfg(feature = "db")]
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::new(ErrorCode::NotFound),
            other => {
                tracing::error!(error = %other, "Database error");
                Self::new(ErrorCode::DatabaseError)
            }
        }
    }
}

/// Body of every non-2xx response
///
/// ```json
/// { "code": 6004, "message": "Coupon has expired", "details": { "code": "EARLY20" } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, Value>>,
}

impl From<&AppError> for ErrorBody {
    fn from(err: &AppError) -> Self {
        Self {
            code: err.code.code(),
            message: err.message.clone(),
            details: err.details.clone(),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.http_status();

        // Internal messages stay in the log
        let body = if self.code.category() == ErrorCategory::System {
            tracing::error!(code = %self.code, message = %self.message, "System error");
            ErrorBody::from(&AppError {
                message: self.code.message().to_string(),
                ..self
            })
        } else {
            ErrorBody::from(&self)
        };

        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_message_comes_from_code() {
        let err = AppError::new(ErrorCode::TicketNotFound);
        assert_eq!(err.message, "Ticket not found");
        assert!(err.details.is_none());
    }

    #[test]
    fn duplicate_scan_carries_context() {
        let err = AppError::new(ErrorCode::TicketAlreadyCheckedIn)
            .with_detail("ticket_number", "EMS-ABCD2345")
            .with_detail("checked_in_at", 1_700_000_000_000_i64);

        let details = err.details.unwrap();
        assert_eq!(details["ticket_number"], "EMS-ABCD2345");
        assert_eq!(details["checked_in_at"], 1_700_000_000_000_i64);
    }

    #[test]
    fn status_follows_code() {
        assert_eq!(
            AppError::new(ErrorCode::CouponUsageLimitReached).http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::not_authenticated().http_status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::too_many_requests().http_status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn error_body_shape() {
        let err = AppError::new(ErrorCode::CouponExpired).with_detail("code", "EARLY20");
        let json = serde_json::to_value(ErrorBody::from(&err)).unwrap();

        assert_eq!(json["code"], 6004);
        assert_eq!(json["message"], "Coupon has expired");
        assert_eq!(json["details"]["code"], "EARLY20");

        let bare = serde_json::to_value(ErrorBody::from(&AppError::too_many_requests())).unwrap();
        assert!(bare.get("details").is_none());
    }

    #[test]
    fn internal_message_is_not_leaked() {
        use axum::response::IntoResponse;

        let response = AppError::internal("pool exhausted").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
