//! Data models
//!
//! Shared between ems-server and the web frontends (via API).
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are snowflake `i64`, all timestamps Unix millis, money is `Decimal`.

pub mod admin_user;
pub mod coupon;
pub mod email_log;
pub mod panel_interest;
pub mod payment;
pub mod registration;
pub mod ticket;
pub mod ticket_type;

// Re-exports
pub use admin_user::*;
pub use coupon::*;
pub use email_log::*;
pub use panel_interest::*;
pub use payment::*;
pub use registration::*;
pub use ticket::*;
pub use ticket_type::*;
