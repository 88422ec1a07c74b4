//! Venue check-in
//!
//! The conditional `ISSUED -> CHECKED_IN` update decides every scan. Only
//! when it matches nothing is the ticket re-read to explain the refusal.

use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{TicketDetail, TicketStatus};

use crate::auth::AdminIdentity;
use crate::db;
use crate::error::ServiceResult;
use crate::security_log;
use crate::state::AppState;
use crate::tickets::parse_scan;
use crate::util::now_millis;

/// Successful scan
#[derive(Debug, Serialize)]
pub struct CheckInResult {
    /// Always `CHECKED_IN`
    pub result: &'static str,
    pub ticket: TicketDetail,
    pub attendee: String,
    pub ticket_type: String,
}

/// Resolve a scanned or typed code to a ticket number.
fn resolve(state: &AppState, code: &str) -> Result<String, AppError> {
    parse_scan(
        code,
        &state.config.ticket_signing_secret,
        &state.config.ticket_prefix,
    )
    .map_err(AppError::from)
}

/// Check a ticket in. Exactly one concurrent scan of the same ticket succeeds.
pub async fn verify(
    state: &AppState,
    code: &str,
    identity: &AdminIdentity,
) -> ServiceResult<CheckInResult> {
    let ticket_number = match resolve(state, code) {
        Ok(n) => n,
        Err(e) => {
            security_log!(
                "WARN",
                "ticket_code_rejected",
                username = identity.username.clone(),
                reason = e.message.clone()
            );
            return Err(e.into());
        }
    };

    let now = now_millis();
    let updated =
        db::tickets::check_in(&state.pool, &ticket_number, &identity.username, now).await?;

    let detail = db::tickets::find_detail(&state.pool, &ticket_number).await?;

    match (updated, detail) {
        (Some(_), Some(ticket)) => {
            tracing::info!(
                ticket_number = %ticket.ticket_number,
                registration_id = ticket.registration_id,
                staff = %identity.username,
                "Ticket checked in"
            );
            Ok(CheckInResult {
                result: "CHECKED_IN",
                attendee: ticket.attendee_name.clone(),
                ticket_type: ticket.ticket_type_name.clone(),
                ticket,
            })
        }
        (_, None) => Err(AppError::new(ErrorCode::TicketNotFound)
            .with_detail("ticket_number", ticket_number)
            .into()),
        (None, Some(ticket)) => Err(refusal(&ticket).into()),
    }
}

/// Why a ticket that exists could not be checked in
fn refusal(ticket: &TicketDetail) -> AppError {
    match ticket.status {
        TicketStatus::CheckedIn => {
            tracing::warn!(
                ticket_number = %ticket.ticket_number,
                checked_in_by = ?ticket.checked_in_by,
                "Duplicate scan"
            );
            AppError::new(ErrorCode::TicketAlreadyCheckedIn)
                .with_detail("ticket_number", ticket.ticket_number.clone())
                .with_detail("attendee", ticket.attendee_name.clone())
                .with_detail("checked_in_at", ticket.checked_in_at)
                .with_detail("checked_in_by", ticket.checked_in_by.clone())
        }
        TicketStatus::Cancelled => AppError::new(ErrorCode::TicketCancelled)
            .with_detail("ticket_number", ticket.ticket_number.clone()),
        // Only reachable if the ticket was reissued between the update and the read
        TicketStatus::Issued => AppError::with_message(
            ErrorCode::TicketInvalid,
            "Ticket state changed during the scan, scan again",
        ),
    }
}

/// Look a ticket up without checking it in.
pub async fn lookup(state: &AppState, code: &str) -> ServiceResult<TicketDetail> {
    let ticket_number = resolve(state, code)?;
    let ticket = db::tickets::find_detail(&state.pool, &ticket_number)
        .await?
        .ok_or(ErrorCode::TicketNotFound)?;
    Ok(ticket)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(status: TicketStatus) -> TicketDetail {
        TicketDetail {
            id: 1,
            registration_id: 2,
            ticket_type_id: 3,
            ticket_type_name: "Visitor".to_string(),
            ticket_number: "EMS-ABCD2345".to_string(),
            attendee_name: "Maria Borg".to_string(),
            email: "maria@example.com".to_string(),
            company: None,
            status,
            checked_in_at: Some(1_760_000_000_000),
            checked_in_by: Some("door1".to_string()),
            created_at: 0,
        }
    }

    #[test]
    fn duplicate_scan_reports_first_check_in() {
        let err = refusal(&detail(TicketStatus::CheckedIn));
        assert_eq!(err.code, ErrorCode::TicketAlreadyCheckedIn);
        assert_eq!(err.http_status(), http::StatusCode::CONFLICT);
        let details = err.details.unwrap();
        assert_eq!(details["checked_in_at"], 1_760_000_000_000_i64);
        assert_eq!(details["checked_in_by"], "door1");
    }

    #[test]
    fn cancelled_ticket_refused() {
        let err = refusal(&detail(TicketStatus::Cancelled));
        assert_eq!(err.code, ErrorCode::TicketCancelled);
        assert_eq!(err.http_status(), http::StatusCode::CONFLICT);
    }
}
