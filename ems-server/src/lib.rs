//! EMS ticketing service
//!
//! Registration and ticketing for the EMS Trade Fair at VR Room Malta.
//!
//! ```text
//! ems-server/src/
//! ├── api/        # axum routers and handlers
//! ├── auth/       # JWT, role gate, per-IP rate limits
//! ├── services/   # registration, fulfillment, check-in, catalog, accounts
//! ├── db/         # sqlx queries, one module per table
//! ├── pricing/    # quote calculation and coupon rules (pure)
//! ├── tickets/    # ticket numbers, signed QR payloads, ticket document
//! ├── stripe/     # Checkout Sessions, refunds, webhook signatures
//! ├── email/      # SES v2 delivery and templates
//! └── tasks.rs    # expiry sweeper, rate limiter cleanup
//! ```
//!
//! Every stock, coupon and ticket invariant is held by a single conditional
//! UPDATE inside a transaction; see `db::ticket_types`, `db::coupons` and
//! `db::tickets`.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod email;
pub mod error;
pub mod pricing;
pub mod services;
pub mod state;
pub mod stripe;
pub mod tasks;
pub mod tickets;
pub mod util;
pub mod validation;

pub use config::Config;
pub use error::{ServiceError, ServiceResult};
pub use state::AppState;

/// Structured security event on the `security` target
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}
