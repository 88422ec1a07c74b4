//! Database access layer
//!
//! Free functions over `PgPool`. Functions that must run inside a caller's
//! transaction take `&mut PgConnection` and carry an `_in_tx` suffix.
//! Every stock, coupon and check-in change is a single conditional UPDATE;
//! a `false`/`None` result means the guard did not match.

pub mod admin_users;
pub mod coupons;
pub mod email_logs;
pub mod panel_interests;
pub mod payments;
pub mod registrations;
pub mod ticket_types;
pub mod tickets;
pub mod webhook_events;
