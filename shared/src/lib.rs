//! Shared types for the EMS ticketing service
//!
//! Domain models, the unified error system and small utilities used by
//! ems-server and its API clients.

pub mod error;
pub mod models;
pub mod util;

