//! Coupon eligibility rules
//!
//! The usage-limit check here only answers "would this coupon work right now".
//! The binding check is the conditional increment in `db::coupons::claim_in_tx`.

use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::models::Coupon;

/// Why a coupon cannot be applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponRejection {
    Inactive,
    NotYetValid,
    Expired,
    NotApplicable,
    MinimumQuantity { min_quantity: i32 },
    UsageLimitReached,
}

impl CouponRejection {
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Inactive => ErrorCode::CouponInactive,
            Self::NotYetValid => ErrorCode::CouponNotYetValid,
            Self::Expired => ErrorCode::CouponExpired,
            Self::NotApplicable => ErrorCode::CouponNotApplicable,
            Self::MinimumQuantity { .. } => ErrorCode::CouponMinimumQuantity,
            Self::UsageLimitReached => ErrorCode::CouponUsageLimitReached,
        }
    }
}

impl From<CouponRejection> for AppError {
    fn from(rejection: CouponRejection) -> Self {
        let code = rejection.error_code();
        match rejection {
            CouponRejection::MinimumQuantity { min_quantity } => AppError::with_message(
                code,
                format!("{} (minimum {min_quantity} tickets)", code.message()),
            )
            .with_detail("min_quantity", min_quantity),
            _ => AppError::new(code),
        }
    }
}

/// Coupon codes are matched case-insensitively and stored upper-case
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// Check whether `coupon` may be used for `quantity` tickets of `ticket_type_id` at `now` (millis).
///
/// Checks run in a fixed order so the reported reason is deterministic.
pub fn check_eligibility(
    coupon: &Coupon,
    ticket_type_id: i64,
    quantity: i32,
    now: i64,
) -> Result<(), CouponRejection> {
    if !coupon.is_active {
        return Err(CouponRejection::Inactive);
    }
    if let Some(from) = coupon.valid_from
        && now < from
    {
        return Err(CouponRejection::NotYetValid);
    }
    if let Some(until) = coupon.valid_until
        && now > until
    {
        return Err(CouponRejection::Expired);
    }
    if let Some(restricted_to) = coupon.ticket_type_id
        && restricted_to != ticket_type_id
    {
        return Err(CouponRejection::NotApplicable);
    }
    if let Some(min_quantity) = coupon.min_quantity
        && quantity < min_quantity
    {
        return Err(CouponRejection::MinimumQuantity { min_quantity });
    }
    if let Some(max) = coupon.max_uses
        && coupon.used_count >= max
    {
        return Err(CouponRejection::UsageLimitReached);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::models::DiscountType;

    const NOW: i64 = 1_760_000_000_000;

    fn make_coupon() -> Coupon {
        Coupon {
            id: 7,
            code: "EARLY20".to_string(),
            description: None,
            discount_type: DiscountType::Percentage,
            discount_value: Decimal::from(20),
            max_uses: Some(10),
            used_count: 3,
            min_quantity: None,
            ticket_type_id: None,
            valid_from: Some(NOW - 1_000),
            valid_until: Some(NOW + 1_000),
            is_active: true,
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn eligible_coupon_passes() {
        assert_eq!(check_eligibility(&make_coupon(), 1, 1, NOW), Ok(()));
    }

    #[test]
    fn inactive_wins_over_everything() {
        let mut c = make_coupon();
        c.is_active = false;
        c.used_count = 10;
        c.valid_until = Some(NOW - 1);
        assert_eq!(
            check_eligibility(&c, 1, 1, NOW),
            Err(CouponRejection::Inactive)
        );
    }

    #[test]
    fn validity_window_bounds_are_inclusive() {
        let c = make_coupon();
        assert_eq!(check_eligibility(&c, 1, 1, NOW - 1_000), Ok(()));
        assert_eq!(check_eligibility(&c, 1, 1, NOW + 1_000), Ok(()));
        assert_eq!(
            check_eligibility(&c, 1, 1, NOW - 1_001),
            Err(CouponRejection::NotYetValid)
        );
        assert_eq!(
            check_eligibility(&c, 1, 1, NOW + 1_001),
            Err(CouponRejection::Expired)
        );
    }

    #[test]
    fn open_ended_window() {
        let mut c = make_coupon();
        c.valid_from = None;
        c.valid_until = None;
        assert_eq!(check_eligibility(&c, 1, 1, 0), Ok(()));
        assert_eq!(check_eligibility(&c, 1, 1, i64::MAX), Ok(()));
    }

    #[test]
    fn ticket_type_restriction() {
        let mut c = make_coupon();
        c.ticket_type_id = Some(42);
        assert_eq!(check_eligibility(&c, 42, 1, NOW), Ok(()));
        assert_eq!(
            check_eligibility(&c, 43, 1, NOW),
            Err(CouponRejection::NotApplicable)
        );
    }

    #[test]
    fn minimum_quantity() {
        let mut c = make_coupon();
        c.min_quantity = Some(3);
        assert_eq!(
            check_eligibility(&c, 1, 2, NOW),
            Err(CouponRejection::MinimumQuantity { min_quantity: 3 })
        );
        assert_eq!(check_eligibility(&c, 1, 3, NOW), Ok(()));
    }

    #[test]
    fn usage_limit() {
        let mut c = make_coupon();
        c.used_count = 9;
        assert_eq!(check_eligibility(&c, 1, 1, NOW), Ok(()));
        c.used_count = 10;
        assert_eq!(
            check_eligibility(&c, 1, 1, NOW),
            Err(CouponRejection::UsageLimitReached)
        );
        c.max_uses = None;
        c.used_count = 10_000;
        assert_eq!(check_eligibility(&c, 1, 1, NOW), Ok(()));
    }

    #[test]
    fn normalize() {
        assert_eq!(normalize_code("  early20 "), "EARLY20");
    }

    #[test]
    fn rejection_to_app_error() {
        let err: AppError = CouponRejection::MinimumQuantity { min_quantity: 5 }.into();
        assert_eq!(err.code, ErrorCode::CouponMinimumQuantity);
        assert!(err.message.ends_with("(minimum 5 tickets)"));
        assert_eq!(err.details.unwrap().get("min_quantity").unwrap(), 5);

        let err: AppError = CouponRejection::Expired.into();
        assert_eq!(err.code, ErrorCode::CouponExpired);
    }

    #[test]
    fn rejection_serializes_with_reason_tag() {
        let json = serde_json::to_value(CouponRejection::UsageLimitReached).unwrap();
        assert_eq!(json["reason"], "USAGE_LIMIT_REACHED");
        let json = serde_json::to_value(CouponRejection::MinimumQuantity { min_quantity: 2 })
            .unwrap();
        assert_eq!(json["reason"], "MINIMUM_QUANTITY");
        assert_eq!(json["min_quantity"], 2);
    }
}
