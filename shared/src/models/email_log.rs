//! Email Log Model

use serde::{Deserialize, Serialize};

/// Email delivery outcome
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "email_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum EmailStatus {
    Sent,
    Failed,
}

/// Kind of outgoing email
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "email_kind", rename_all = "snake_case")
)]
pub enum EmailKind {
    TicketConfirmation,
    TicketResend,
    ReservationExpired,
    PanelInterestAck,
    RefundProcessed,
}

/// One send attempt (成功或失败都记录)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct EmailLog {
    pub id: i64,
    pub recipient: String,
    pub subject: String,
    pub kind: EmailKind,
    pub registration_id: Option<i64>,
    pub status: EmailStatus,
    pub error: Option<String>,
    pub created_at: i64,
}
