//! Ticket Model

use serde::{Deserialize, Serialize};

/// Ticket status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(
    feature = "db",
    sqlx(type_name = "ticket_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
pub enum TicketStatus {
    Issued,
    CheckedIn,
    Cancelled,
}

/// Ticket entity (门票)
///
/// `ISSUED -> CHECKED_IN` happens at most once; `checked_in_at` and
/// `checked_in_by` are written by that transition only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Ticket {
    pub id: i64,
    pub registration_id: i64,
    pub ticket_type_id: i64,
    pub ticket_number: String,
    pub attendee_name: String,
    pub status: TicketStatus,
    pub checked_in_at: Option<i64>,
    /// Username of the staff member who scanned the ticket
    pub checked_in_by: Option<String>,
    pub created_at: i64,
}

/// Ticket joined with its registration and type (scanner / admin views)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct TicketDetail {
    pub id: i64,
    pub registration_id: i64,
    pub ticket_type_id: i64,
    pub ticket_type_name: String,
    pub ticket_number: String,
    pub attendee_name: String,
    pub email: String,
    pub company: Option<String>,
    pub status: TicketStatus,
    pub checked_in_at: Option<i64>,
    pub checked_in_by: Option<String>,
    pub created_at: i64,
}

/// Ticket counts for the dashboard
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct TicketCounts {
    pub issued: i64,
    pub checked_in: i64,
    pub cancelled: i64,
}
