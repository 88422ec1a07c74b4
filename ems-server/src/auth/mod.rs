//! Admin and staff authentication
//!
//! - [`jwt`]: HS256 tokens issued at `/api/admin/login`
//! - [`middleware`]: bearer-token check and role gate
//! - [`rate_limit`]: per-IP fixed-window limits for public routes

pub mod jwt;
pub mod middleware;
pub mod rate_limit;

pub use jwt::{AdminClaims, AdminIdentity, create_token, verify_token};
pub use middleware::{admin_auth_middleware, require_admin};
pub use rate_limit::RateLimiter;
