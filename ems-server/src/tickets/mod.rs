//! Ticket artefacts
//!
//! - [`number`]: human-typeable unique ticket numbers
//! - [`qr`]: signed QR payloads and scanner input parsing
//! - [`document`]: PDF ticket with the QR code (email attachment / admin download)

pub mod document;
pub mod number;
pub mod qr;

pub use document::{QrMatrix, TicketDocument, render_ticket_pdf};
pub use number::generate_ticket_number;
pub use qr::{ScanError, parse_scan, qr_payload};
