//! Error codes and the JSON error body shared by the server and its clients
//!
//! Code ranges:
//!
//! | range | area |
//! |-------|------|
//! | 0xxx  | general |
//! | 1xxx  | authentication |
//! | 2xxx  | permissions, staff accounts |
//! | 3xxx  | ticket types, stock |
//! | 4xxx  | registrations, tickets, check-in |
//! | 5xxx  | payments |
//! | 6xxx  | coupons |
//! | 7xxx  | notifications |
//! | 9xxx  | system |
//!
//! ```
//! use shared::error::{AppError, ErrorBody, ErrorCode};
//!
//! let err = AppError::new(ErrorCode::TicketAlreadyCheckedIn)
//!     .with_detail("ticket_number", "EMS-7KQ2XH4M");
//! assert_eq!(ErrorBody::from(&err).code, 4102);
//! ```

mod category;
mod codes;
mod http;
mod types;

pub use category::ErrorCategory;
pub use codes::{ErrorCode, InvalidErrorCode};
pub use types::{AppError, AppResult, ErrorBody};
