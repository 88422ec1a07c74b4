//! Service-layer errors
//!
//! Services return [`ServiceResult`]. Database, Stripe and SES failures are
//! collapsed into [`ServiceError::Infra`] and reach the client as a bare
//! `InternalError`; registration, coupon and ticket rule violations travel as
//! [`ServiceError::Rule`] with their own `ErrorCode`.

use axum::response::IntoResponse;
use shared::error::{AppError, ErrorCode};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug)]
pub enum ServiceError {
    /// Storage or upstream failure, logged and never shown to the client
    Infra(BoxError),
    /// A rule violation the client can act on
    Rule(AppError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(e: sqlx::Error) -> Self {
        ServiceError::Infra(e.into())
    }
}

impl From<BoxError> for ServiceError {
    fn from(e: BoxError) -> Self {
        ServiceError::Infra(e)
    }
}

impl From<AppError> for ServiceError {
    fn from(e: AppError) -> Self {
        ServiceError::Rule(e)
    }
}

impl From<ErrorCode> for ServiceError {
    fn from(code: ErrorCode) -> Self {
        ServiceError::Rule(AppError::new(code))
    }
}

impl From<ServiceError> for AppError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Rule(rule) => rule,
            ServiceError::Infra(source) => {
                tracing::error!(error = %source, "Infrastructure failure");
                AppError::new(ErrorCode::InternalError)
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> axum::response::Response {
        AppError::from(self).into_response()
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Duplicate ticket number, coupon code or username
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
