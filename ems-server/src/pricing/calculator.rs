//! Price Calculator
//!
//! Computes the amounts stored on a registration. All money is `Decimal`,
//! rounded to cents with midpoint-away-from-zero.

use rust_decimal::prelude::*;
use serde::Serialize;
use shared::models::{Coupon, DiscountType};

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

#[inline]
fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}

/// The part of a coupon that affects the price
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CouponDiscount {
    pub discount_type: DiscountType,
    pub value: Decimal,
}

impl From<&Coupon> for CouponDiscount {
    fn from(coupon: &Coupon) -> Self {
        Self {
            discount_type: coupon.discount_type,
            value: coupon.discount_value,
        }
    }
}

/// Why an order costs nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FreeReason {
    /// EMS clients attend for free
    EmsClient,
    /// A coupon covered the whole subtotal
    FullDiscount,
}

/// Price breakdown for one registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceQuote {
    pub unit_price: Decimal,
    pub quantity: i32,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub free_reason: Option<FreeReason>,
}

impl PriceQuote {
    /// No payment needed, tickets can be issued right away
    pub fn is_free(&self) -> bool {
        self.total.is_zero()
    }
}

/// Compute the price of `quantity` tickets at `unit_price`.
///
/// - EMS clients get the whole subtotal discounted; coupons are ignored.
/// - `PERCENTAGE` coupons take `min(value, 100)`% of the subtotal.
/// - `FIXED_AMOUNT` coupons take `value` off the order, never more than the subtotal.
pub fn quote(
    unit_price: Decimal,
    quantity: i32,
    coupon: Option<&CouponDiscount>,
    is_ems_client: bool,
) -> PriceQuote {
    let unit_price = round_money(unit_price);
    let subtotal = round_money(unit_price * Decimal::from(quantity.max(0)));

    let (discount, free_reason) = if is_ems_client {
        (subtotal, Some(FreeReason::EmsClient))
    } else {
        let discount = coupon
            .map(|c| coupon_discount(c, subtotal))
            .unwrap_or(Decimal::ZERO);
        let covers_all = !subtotal.is_zero() && discount >= subtotal;
        (discount, covers_all.then_some(FreeReason::FullDiscount))
    };

    let total = (subtotal - discount).max(Decimal::ZERO);

    PriceQuote {
        unit_price,
        quantity,
        subtotal,
        discount,
        total,
        free_reason,
    }
}

/// Discount amount for a coupon against a subtotal, clamped to `[0, subtotal]`
fn coupon_discount(coupon: &CouponDiscount, subtotal: Decimal) -> Decimal {
    let value = coupon.value.max(Decimal::ZERO);
    let raw = match coupon.discount_type {
        DiscountType::Percentage => {
            let pct = value.min(Decimal::ONE_HUNDRED);
            subtotal * pct / Decimal::ONE_HUNDRED
        }
        DiscountType::FixedAmount => value,
    };
    round_money(raw).min(subtotal)
}

/// Convert an amount to the smallest currency unit (cents) for Stripe.
///
/// Returns `None` if the amount does not fit in an `i64`.
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    round_money(amount)
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|cents| cents.to_i64())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_exact(s).unwrap()
    }

    fn pct(value: Decimal) -> CouponDiscount {
        CouponDiscount {
            discount_type: DiscountType::Percentage,
            value,
        }
    }

    fn fixed(value: Decimal) -> CouponDiscount {
        CouponDiscount {
            discount_type: DiscountType::FixedAmount,
            value,
        }
    }

    #[test]
    fn no_coupon_charges_full_price() {
        let q = quote(d("25.00"), 3, None, false);
        assert_eq!(q.subtotal, d("75.00"));
        assert_eq!(q.discount, Decimal::ZERO);
        assert_eq!(q.total, d("75.00"));
        assert_eq!(q.free_reason, None);
        assert!(!q.is_free());
    }

    #[test]
    fn percentage_coupon() {
        let q = quote(d("40.00"), 2, Some(&pct(d("25"))), false);
        assert_eq!(q.subtotal, d("80.00"));
        assert_eq!(q.discount, d("20.00"));
        assert_eq!(q.total, d("60.00"));
    }

    #[test]
    fn percentage_rounds_half_away_from_zero() {
        // 33.33 * 15% = 4.9995 -> 5.00
        let q = quote(d("33.33"), 1, Some(&pct(d("15"))), false);
        assert_eq!(q.discount, d("5.00"));
        assert_eq!(q.total, d("28.33"));
    }

    #[test]
    fn percentage_above_hundred_is_capped() {
        let q = quote(d("20.00"), 2, Some(&pct(d("150"))), false);
        assert_eq!(q.discount, d("40.00"));
        assert_eq!(q.total, Decimal::ZERO);
        assert_eq!(q.free_reason, Some(FreeReason::FullDiscount));
        assert!(q.is_free());
    }

    #[test]
    fn fixed_amount_applies_once_per_order() {
        let q = quote(d("15.00"), 4, Some(&fixed(d("10.00"))), false);
        assert_eq!(q.subtotal, d("60.00"));
        assert_eq!(q.discount, d("10.00"));
        assert_eq!(q.total, d("50.00"));
    }

    #[test]
    fn fixed_amount_never_exceeds_subtotal() {
        let q = quote(d("15.00"), 1, Some(&fixed(d("100.00"))), false);
        assert_eq!(q.discount, d("15.00"));
        assert_eq!(q.total, Decimal::ZERO);
        assert_eq!(q.free_reason, Some(FreeReason::FullDiscount));
    }

    #[test]
    fn negative_coupon_value_is_ignored() {
        let q = quote(d("15.00"), 1, Some(&fixed(d("-5.00"))), false);
        assert_eq!(q.discount, Decimal::ZERO);
        assert_eq!(q.total, d("15.00"));
    }

    #[test]
    fn ems_client_is_free_and_ignores_coupon() {
        let q = quote(d("50.00"), 2, Some(&pct(d("10"))), true);
        assert_eq!(q.subtotal, d("100.00"));
        assert_eq!(q.discount, d("100.00"));
        assert_eq!(q.total, Decimal::ZERO);
        assert_eq!(q.free_reason, Some(FreeReason::EmsClient));
    }

    #[test]
    fn zero_priced_ticket_is_free_without_reason() {
        let q = quote(Decimal::ZERO, 2, None, false);
        assert!(q.is_free());
        assert_eq!(q.free_reason, None);
    }

    #[test]
    fn minor_units() {
        assert_eq!(to_minor_units(d("12.34")), Some(1234));
        assert_eq!(to_minor_units(d("0.005")), Some(1));
        assert_eq!(to_minor_units(Decimal::ZERO), Some(0));
        assert_eq!(to_minor_units(Decimal::MAX), None);
    }
}
