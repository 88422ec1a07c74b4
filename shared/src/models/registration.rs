//! Registration Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Registration status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "registration_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum RegistrationStatus {
    /// Stock (and coupon) reserved, waiting for Stripe
    PendingPayment,
    /// Paid or free, tickets issued
    Confirmed,
    /// Cancelled by an admin
    Cancelled,
    /// Reservation lapsed before payment
    Expired,
    /// Payment refunded through Stripe
    Refunded,
}

impl RegistrationStatus {
    /// Whether the registration still holds reserved stock
    pub fn holds_reservation(&self) -> bool {
        matches!(self, Self::PendingPayment)
    }

    /// Terminal states never change again
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Expired | Self::Refunded)
    }
}

/// Registration entity (报名)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Registration {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub is_ems_client: bool,
    pub ticket_type_id: i64,
    pub quantity: i32,
    /// One name per ticket; empty means every ticket carries the registrant's name
    pub attendee_names: Vec<String>,
    pub coupon_id: Option<i64>,
    pub coupon_code: Option<String>,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub status: RegistrationStatus,
    /// Reservation deadline (only meaningful while `PENDING_PAYMENT`)
    pub expires_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Registration {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    /// Name printed on the `index`-th ticket
    pub fn attendee_name(&self, index: usize) -> String {
        self.attendee_names
            .get(index)
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(String::from)
            .unwrap_or_else(|| self.full_name())
    }
}

/// Registration list row with ticket type name (admin list view)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct RegistrationSummary {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub company: Option<String>,
    pub is_ems_client: bool,
    pub ticket_type_id: i64,
    pub ticket_type_name: String,
    pub quantity: i32,
    pub coupon_code: Option<String>,
    pub total: Decimal,
    pub status: RegistrationStatus,
    pub created_at: i64,
}

/// Registration count per status (dashboard)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct RegistrationStatusCount {
    pub status: RegistrationStatus,
    pub count: i64,
}
