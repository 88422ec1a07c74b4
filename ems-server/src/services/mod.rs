//! Business logic between the HTTP handlers and the `db` layer
//!
//! Services own transactions. Handlers stay thin: extract, call, wrap in `Json`.

pub mod catalog;
pub mod checkin;
pub mod fulfillment;
pub mod registration;
pub mod users;
