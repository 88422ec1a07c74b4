//! Error areas, derived from the thousands digit of the code

use super::codes::ErrorCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    General,
    Auth,
    Permission,
    TicketType,
    Registration,
    Payment,
    Coupon,
    Notification,
    /// Logged server-side, never detailed to clients
    System,
}

impl ErrorCategory {
    pub fn from_code(code: u16) -> Self {
        match code / 1000 {
            0 => Self::General,
            1 => Self::Auth,
            2 => Self::Permission,
            3 => Self::TicketType,
            4 => Self::Registration,
            5 => Self::Payment,
            6 => Self::Coupon,
            7 | 8 => Self::Notification,
            _ => Self::System,
        }
    }
}

impl ErrorCode {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::from_code(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges() {
        let cases = [
            (0, ErrorCategory::General),
            (9, ErrorCategory::General),
            (1001, ErrorCategory::Auth),
            (2102, ErrorCategory::Permission),
            (3003, ErrorCategory::TicketType),
            (4102, ErrorCategory::Registration),
            (5001, ErrorCategory::Payment),
            (6005, ErrorCategory::Coupon),
            (7001, ErrorCategory::Notification),
            (9001, ErrorCategory::System),
            (10000, ErrorCategory::System),
        ];
        for (code, expected) in cases {
            assert_eq!(ErrorCategory::from_code(code), expected, "code {code}");
        }
    }

    #[test]
    fn codes_land_in_their_area() {
        assert_eq!(ErrorCode::TicketSoldOut.category(), ErrorCategory::TicketType);
        assert_eq!(ErrorCode::TicketAlreadyCheckedIn.category(), ErrorCategory::Registration);
        assert_eq!(ErrorCode::CouponExpired.category(), ErrorCategory::Coupon);
        assert_eq!(ErrorCode::DatabaseError.category(), ErrorCategory::System);
    }

    #[test]
    fn serialized_as_snake_case() {
        assert_eq!(
            serde_json::to_string(&ErrorCategory::TicketType).unwrap(),
            "\"ticket_type\""
        );
    }
}
