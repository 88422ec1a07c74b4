//! Coupon Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Discount type enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "discount_type", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum DiscountType {
    /// `discount_value` is a percentage of the subtotal (capped at 100)
    Percentage,
    /// `discount_value` is a fixed amount off the whole order
    FixedAmount,
}

/// Coupon entity (优惠码)
///
/// `used_count` counts redemptions in `RESERVED` or `CONFIRMED` state.
/// `max_uses = None` means unlimited.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Coupon {
    pub id: i64,
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub min_quantity: Option<i32>,
    /// Restrict to one ticket type (None = any)
    pub ticket_type_id: Option<i64>,
    pub valid_from: Option<i64>,
    pub valid_until: Option<i64>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Coupon {
    /// Remaining redemptions, `None` when unlimited
    pub fn remaining_uses(&self) -> Option<i32> {
        self.max_uses.map(|max| (max - self.used_count).max(0))
    }
}

/// Create coupon payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouponCreate {
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: Decimal,
    pub max_uses: Option<i32>,
    pub min_quantity: Option<i32>,
    pub ticket_type_id: Option<i64>,
    pub valid_from: Option<i64>,
    pub valid_until: Option<i64>,
    pub is_active: Option<bool>,
}

/// Update coupon payload
///
/// Nullable limits use `Option<Option<_>>`: absent = keep, `null` = clear.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CouponUpdate {
    pub description: Option<String>,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<Decimal>,
    #[serde(default, with = "double_option")]
    pub max_uses: Option<Option<i32>>,
    #[serde(default, with = "double_option")]
    pub min_quantity: Option<Option<i32>>,
    #[serde(default, with = "double_option")]
    pub ticket_type_id: Option<Option<i64>>,
    #[serde(default, with = "double_option")]
    pub valid_from: Option<Option<i64>>,
    #[serde(default, with = "double_option")]
    pub valid_until: Option<Option<i64>>,
    pub is_active: Option<bool>,
}

/// Redemption status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "redemption_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum RedemptionStatus {
    /// Held by a registration awaiting payment
    Reserved,
    /// Registration confirmed
    Confirmed,
    /// Reservation expired or cancelled, slot returned
    Released,
}

/// One coupon use by one registration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct CouponRedemption {
    pub id: i64,
    pub coupon_id: i64,
    pub registration_id: i64,
    pub status: RedemptionStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A corrected `used_count`, returned by the usage fix-up
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct CouponUsageFix {
    pub coupon_id: i64,
    pub code: String,
    pub before: i32,
    pub after: i32,
}

/// Coupon usage line for the dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct CouponUsage {
    pub coupon_id: i64,
    pub code: String,
    pub used_count: i32,
    pub max_uses: Option<i32>,
    pub confirmed: i64,
}

/// Serde helper distinguishing a missing field from an explicit `null`
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<Option<T>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discount_type_wire_format() {
        let json = serde_json::to_string(&DiscountType::FixedAmount).unwrap();
        assert_eq!(json, "\"FIXED_AMOUNT\"");
        let parsed: DiscountType = serde_json::from_str("\"PERCENTAGE\"").unwrap();
        assert_eq!(parsed, DiscountType::Percentage);
    }

    #[test]
    fn update_distinguishes_missing_from_null() {
        let update: CouponUpdate = serde_json::from_str(r#"{"max_uses": null}"#).unwrap();
        assert_eq!(update.max_uses, Some(None));
        assert_eq!(update.valid_until, None);

        let update: CouponUpdate = serde_json::from_str(r#"{"max_uses": 50}"#).unwrap();
        assert_eq!(update.max_uses, Some(Some(50)));
    }
}
