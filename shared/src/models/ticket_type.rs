//! Ticket Type Model

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Ticket type entity (票种)
///
/// Stock is tracked as three counters. `available_stock()` is derived and never
/// stored: `total_stock - reserved_stock - sold_stock`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct TicketType {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub total_stock: i32,
    pub reserved_stock: i32,
    pub sold_stock: i32,
    pub max_per_order: i32,
    pub sort_order: i32,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TicketType {
    /// Tickets that can still be reserved
    pub fn available_stock(&self) -> i32 {
        (self.total_stock - self.reserved_stock - self.sold_stock).max(0)
    }

    /// Reserved + sold, the floor for `total_stock`
    pub fn committed_stock(&self) -> i32 {
        self.reserved_stock + self.sold_stock
    }
}

/// Create ticket type payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketTypeCreate {
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub total_stock: i32,
    pub max_per_order: Option<i32>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

/// Update ticket type payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketTypeUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub total_stock: Option<i32>,
    pub max_per_order: Option<i32>,
    pub sort_order: Option<i32>,
    pub is_active: Option<bool>,
}

/// Public catalog entry shown on the registration form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketTypePublic {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub max_per_order: i32,
    pub available_stock: i32,
    pub sold_out: bool,
}

impl From<&TicketType> for TicketTypePublic {
    fn from(t: &TicketType) -> Self {
        let available_stock = t.available_stock();
        Self {
            id: t.id,
            name: t.name.clone(),
            description: t.description.clone(),
            price: t.price,
            max_per_order: t.max_per_order,
            available_stock,
            sold_out: available_stock == 0,
        }
    }
}

/// Per-type stock figures for the admin dashboard
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSummary {
    pub ticket_type_id: i64,
    pub name: String,
    pub total_stock: i32,
    pub reserved_stock: i32,
    pub sold_stock: i32,
    pub available_stock: i32,
}

impl From<&TicketType> for StockSummary {
    fn from(t: &TicketType) -> Self {
        Self {
            ticket_type_id: t.id,
            name: t.name.clone(),
            total_stock: t.total_stock,
            reserved_stock: t.reserved_stock,
            sold_stock: t.sold_stock,
            available_stock: t.available_stock(),
        }
    }
}

/// Result of recomputing stock counters from registrations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct StockCorrection {
    pub ticket_type_id: i64,
    pub name: String,
    pub reserved_before: i32,
    pub reserved_after: i32,
    pub sold_before: i32,
    pub sold_after: i32,
}
