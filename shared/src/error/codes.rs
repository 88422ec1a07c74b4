//! Unified error codes for the EMS ticketing service
//!
//! This module defines all error codes returned by ems-server and consumed by
//! the registration site, the admin dashboard and the door scanner app.
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 2xxx: Permission / staff account errors
//! - 3xxx: Ticket type (catalog and stock) errors
//! - 4xxx: Registration and ticket errors
//! - 5xxx: Payment errors
//! - 6xxx: Coupon errors
//! - 7xxx: Notification errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Invalid request
    InvalidRequest = 5,
    /// Client exceeded the rate limit
    TooManyRequests = 9,

    // ==================== 1xxx: Auth ====================
    /// User is not authenticated
    NotAuthenticated = 1001,
    /// Invalid credentials (username/password)
    InvalidCredentials = 1002,
    /// Token has expired
    TokenExpired = 1003,
    /// Token is invalid
    TokenInvalid = 1004,
    /// Account is disabled
    AccountDisabled = 1007,

    // ==================== 2xxx: Permission ====================
    /// Permission denied
    PermissionDenied = 2001,
    /// Admin role required
    AdminRequired = 2003,
    /// Admins cannot deactivate or demote themselves
    CannotModifySelf = 2004,
    /// Admin user not found
    AdminUserNotFound = 2101,
    /// Admin username already taken
    UsernameExists = 2102,

    // ==================== 3xxx: Ticket type ====================
    /// Ticket type not found
    TicketTypeNotFound = 3001,
    /// Ticket type is not on sale
    TicketTypeInactive = 3002,
    /// Not enough tickets left
    TicketSoldOut = 3003,
    /// Quantity exceeds the per-order limit
    QuantityExceedsLimit = 3004,
    /// Total stock cannot drop below reserved + sold
    StockBelowCommitted = 3005,

    // ==================== 4xxx: Registration / Ticket ====================
    /// Registration not found
    RegistrationNotFound = 4001,
    /// Registration is no longer awaiting payment
    RegistrationNotPending = 4002,
    /// Registration has already been cancelled
    RegistrationAlreadyCancelled = 4003,
    /// Ticket not found
    TicketNotFound = 4101,
    /// Ticket was already checked in
    TicketAlreadyCheckedIn = 4102,
    /// Ticket has been cancelled
    TicketCancelled = 4103,
    /// Scanned code is malformed or its signature does not match
    TicketInvalid = 4104,

    // ==================== 5xxx: Payment ====================
    /// Checkout session could not be created
    PaymentSetupFailed = 5002,

    // ==================== 6xxx: Coupon ====================
    /// Coupon not found
    CouponNotFound = 6001,
    /// Coupon is disabled
    CouponInactive = 6002,
    /// Coupon validity window has not started
    CouponNotYetValid = 6003,
    /// Coupon validity window has ended
    CouponExpired = 6004,
    /// Coupon has been fully redeemed
    CouponUsageLimitReached = 6005,
    /// Coupon does not apply to the selected ticket type
    CouponNotApplicable = 6006,
    /// Order quantity below the coupon minimum
    CouponMinimumQuantity = 6007,
    /// Coupon code already exists
    CouponCodeExists = 6008,
    /// Usage limit cannot drop below the current usage
    CouponLimitBelowUsage = 6009,

    // ==================== 7xxx: Notification ====================
    /// Email could not be delivered
    EmailSendFailed = 7001,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::TooManyRequests => "Too many requests, try again later",

            // Auth
            ErrorCode::NotAuthenticated => "User is not authenticated",
            ErrorCode::InvalidCredentials => "Invalid username or password",
            ErrorCode::TokenExpired => "Authentication token has expired",
            ErrorCode::TokenInvalid => "Authentication token is invalid",
            ErrorCode::AccountDisabled => "Account is disabled",

            // Permission
            ErrorCode::PermissionDenied => "Permission denied",
            ErrorCode::AdminRequired => "Administrator role is required",
            ErrorCode::CannotModifySelf => "Cannot deactivate or demote own account",
            ErrorCode::AdminUserNotFound => "Admin user not found",
            ErrorCode::UsernameExists => "Username already exists",

            // Ticket type
            ErrorCode::TicketTypeNotFound => "Ticket type not found",
            ErrorCode::TicketTypeInactive => "Ticket type is not on sale",
            ErrorCode::TicketSoldOut => "Not enough tickets available",
            ErrorCode::QuantityExceedsLimit => "Quantity exceeds the per-order limit",
            ErrorCode::StockBelowCommitted => {
                "Total stock cannot be lower than reserved plus sold tickets"
            }

            // Registration / Ticket
            ErrorCode::RegistrationNotFound => "Registration not found",
            ErrorCode::RegistrationNotPending => "Registration is not awaiting payment",
            ErrorCode::RegistrationAlreadyCancelled => "Registration has already been cancelled",
            ErrorCode::TicketNotFound => "Ticket not found",
            ErrorCode::TicketAlreadyCheckedIn => "Ticket has already been checked in",
            ErrorCode::TicketCancelled => "Ticket has been cancelled",
            ErrorCode::TicketInvalid => "Ticket code is invalid",

            // Payment
            ErrorCode::PaymentSetupFailed => "Could not start checkout",

            // Coupon
            ErrorCode::CouponNotFound => "Coupon not found",
            ErrorCode::CouponInactive => "Coupon is not active",
            ErrorCode::CouponNotYetValid => "Coupon is not valid yet",
            ErrorCode::CouponExpired => "Coupon has expired",
            ErrorCode::CouponUsageLimitReached => "Coupon usage limit reached",
            ErrorCode::CouponNotApplicable => "Coupon does not apply to this ticket type",
            ErrorCode::CouponMinimumQuantity => "Quantity is below the coupon minimum",
            ErrorCode::CouponCodeExists => "Coupon code already exists",
            ErrorCode::CouponLimitBelowUsage => {
                "Usage limit cannot be lower than the current usage"
            }

            // Notification
            ErrorCode::EmailSendFailed => "Email could not be sent",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            5 => Ok(ErrorCode::InvalidRequest),
            9 => Ok(ErrorCode::TooManyRequests),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1002 => Ok(ErrorCode::InvalidCredentials),
            1003 => Ok(ErrorCode::TokenExpired),
            1004 => Ok(ErrorCode::TokenInvalid),
            1007 => Ok(ErrorCode::AccountDisabled),

            // Permission
            2001 => Ok(ErrorCode::PermissionDenied),
            2003 => Ok(ErrorCode::AdminRequired),
            2004 => Ok(ErrorCode::CannotModifySelf),
            2101 => Ok(ErrorCode::AdminUserNotFound),
            2102 => Ok(ErrorCode::UsernameExists),

            // Ticket type
            3001 => Ok(ErrorCode::TicketTypeNotFound),
            3002 => Ok(ErrorCode::TicketTypeInactive),
            3003 => Ok(ErrorCode::TicketSoldOut),
            3004 => Ok(ErrorCode::QuantityExceedsLimit),
            3005 => Ok(ErrorCode::StockBelowCommitted),

            // Registration / Ticket
            4001 => Ok(ErrorCode::RegistrationNotFound),
            4002 => Ok(ErrorCode::RegistrationNotPending),
            4003 => Ok(ErrorCode::RegistrationAlreadyCancelled),
            4101 => Ok(ErrorCode::TicketNotFound),
            4102 => Ok(ErrorCode::TicketAlreadyCheckedIn),
            4103 => Ok(ErrorCode::TicketCancelled),
            4104 => Ok(ErrorCode::TicketInvalid),

            // Payment
            5002 => Ok(ErrorCode::PaymentSetupFailed),

            // Coupon
            6001 => Ok(ErrorCode::CouponNotFound),
            6002 => Ok(ErrorCode::CouponInactive),
            6003 => Ok(ErrorCode::CouponNotYetValid),
            6004 => Ok(ErrorCode::CouponExpired),
            6005 => Ok(ErrorCode::CouponUsageLimitReached),
            6006 => Ok(ErrorCode::CouponNotApplicable),
            6007 => Ok(ErrorCode::CouponMinimumQuantity),
            6008 => Ok(ErrorCode::CouponCodeExists),
            6009 => Ok(ErrorCode::CouponLimitBelowUsage),

            // Notification
            7001 => Ok(ErrorCode::EmailSendFailed),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::TooManyRequests.code(), 9);
        assert_eq!(ErrorCode::NotAuthenticated.code(), 1001);
        assert_eq!(ErrorCode::AdminRequired.code(), 2003);
        assert_eq!(ErrorCode::TicketSoldOut.code(), 3003);
        assert_eq!(ErrorCode::TicketAlreadyCheckedIn.code(), 4102);
        assert_eq!(ErrorCode::PaymentSetupFailed.code(), 5002);
        assert_eq!(ErrorCode::CouponUsageLimitReached.code(), 6005);
        assert_eq!(ErrorCode::EmailSendFailed.code(), 7001);
        assert_eq!(ErrorCode::InternalError.code(), 9001);
    }

    #[test]
    fn test_try_from_covers_every_variant() {
        let all = [
            ErrorCode::ValidationFailed,
            ErrorCode::NotFound,
            ErrorCode::InvalidRequest,
            ErrorCode::TooManyRequests,
            ErrorCode::NotAuthenticated,
            ErrorCode::InvalidCredentials,
            ErrorCode::TokenExpired,
            ErrorCode::TokenInvalid,
            ErrorCode::AccountDisabled,
            ErrorCode::PermissionDenied,
            ErrorCode::AdminRequired,
            ErrorCode::CannotModifySelf,
            ErrorCode::AdminUserNotFound,
            ErrorCode::UsernameExists,
            ErrorCode::TicketTypeNotFound,
            ErrorCode::TicketTypeInactive,
            ErrorCode::TicketSoldOut,
            ErrorCode::QuantityExceedsLimit,
            ErrorCode::StockBelowCommitted,
            ErrorCode::RegistrationNotFound,
            ErrorCode::RegistrationNotPending,
            ErrorCode::RegistrationAlreadyCancelled,
            ErrorCode::TicketNotFound,
            ErrorCode::TicketAlreadyCheckedIn,
            ErrorCode::TicketCancelled,
            ErrorCode::TicketInvalid,
            ErrorCode::PaymentSetupFailed,
            ErrorCode::CouponNotFound,
            ErrorCode::CouponInactive,
            ErrorCode::CouponNotYetValid,
            ErrorCode::CouponExpired,
            ErrorCode::CouponUsageLimitReached,
            ErrorCode::CouponNotApplicable,
            ErrorCode::CouponMinimumQuantity,
            ErrorCode::CouponCodeExists,
            ErrorCode::CouponLimitBelowUsage,
            ErrorCode::EmailSendFailed,
            ErrorCode::InternalError,
            ErrorCode::DatabaseError,
        ];
        for code in all {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
            assert!(!code.message().is_empty());
        }
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(999), Err(InvalidErrorCode(999)));
        assert_eq!(ErrorCode::try_from(8001), Err(InvalidErrorCode(8001)));
        assert_eq!(ErrorCode::try_from(10000), Err(InvalidErrorCode(10000)));
    }

    #[test]
    fn test_only_raised_codes_exist() {
        // Gaps in the numbering are codes nothing returns
        for gap in [0, 1, 4, 2002, 5001, 5003, 5005, 9003, 9005] {
            assert!(ErrorCode::try_from(gap).is_err(), "code {gap}");
        }
    }

    #[test]
    fn test_serialize_as_number() {
        let json = serde_json::to_string(&ErrorCode::TicketAlreadyCheckedIn).unwrap();
        assert_eq!(json, "4102");

        let code: ErrorCode = serde_json::from_str("6005").unwrap();
        assert_eq!(code, ErrorCode::CouponUsageLimitReached);

        let result: Result<ErrorCode, _> = serde_json::from_str("4999");
        assert!(result.is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ErrorCode::TicketNotFound), "4101");
        assert_eq!(
            format!("{}", InvalidErrorCode(999)),
            "invalid error code: 999"
        );
    }
}
