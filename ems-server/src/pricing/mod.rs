//! Pricing
//!
//! Pure functions, no I/O:
//! - [`calculator`]: subtotal / discount / total for a registration
//! - [`coupon_rules`]: whether a coupon may be applied to an order

pub mod calculator;
pub mod coupon_rules;

pub use calculator::{CouponDiscount, FreeReason, PriceQuote, quote, to_minor_units};
pub use coupon_rules::{CouponRejection, check_eligibility, normalize_code};
