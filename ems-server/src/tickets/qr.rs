//! QR payloads
//!
//! A ticket QR encodes `EMS1.<ticket_number>.<sig>` where `sig` is the first
//! 8 bytes (16 hex chars) of HMAC-SHA256(secret, ticket_number). Door staff may
//! also type the bare ticket number when a code does not scan.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use shared::error::{AppError, ErrorCode};

use super::number::is_well_formed;

const PAYLOAD_VERSION: &str = "EMS1";
const SIG_BYTES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    #[error("unrecognised ticket code")]
    Malformed,
    #[error("ticket signature mismatch")]
    BadSignature,
}

impl From<ScanError> for AppError {
    fn from(e: ScanError) -> Self {
        AppError::new(ErrorCode::TicketInvalid).with_detail("reason", e.to_string())
    }
}

fn mac_for(ticket_number: &str, secret: &str) -> Hmac<Sha256> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC-SHA256 accepts any key length"));
    mac.update(ticket_number.as_bytes());
    mac
}

/// Build the QR payload for a ticket.
pub fn qr_payload(ticket_number: &str, secret: &str) -> String {
    let tag = mac_for(ticket_number, secret).finalize().into_bytes();
    format!(
        "{PAYLOAD_VERSION}.{ticket_number}.{}",
        hex::encode(&tag[..SIG_BYTES])
    )
}

/// Turn scanner input into a ticket number.
///
/// Accepts a full QR payload (signature checked in constant time) or a bare
/// ticket number typed by staff (case-insensitive).
pub fn parse_scan(input: &str, secret: &str, prefix: &str) -> Result<String, ScanError> {
    let input = input.trim();

    if let Some(rest) = input.strip_prefix(PAYLOAD_VERSION).and_then(|r| r.strip_prefix('.')) {
        let (ticket_number, sig_hex) = rest.rsplit_once('.').ok_or(ScanError::Malformed)?;
        if !is_well_formed(ticket_number, prefix) {
            return Err(ScanError::Malformed);
        }
        let sig = hex::decode(sig_hex).map_err(|_| ScanError::Malformed)?;
        if sig.len() != SIG_BYTES {
            return Err(ScanError::Malformed);
        }
        mac_for(ticket_number, secret)
            .verify_truncated_left(&sig)
            .map_err(|_| ScanError::BadSignature)?;
        return Ok(ticket_number.to_string());
    }

    let candidate = input.to_uppercase();
    if is_well_formed(&candidate, prefix) {
        Ok(candidate)
    } else {
        Err(ScanError::Malformed)
    }
}
