//! Read-only listings: tickets, email log, panel interests

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use http::header;
use serde::Deserialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{EmailLog, PanelInterest, TicketDetail, TicketStatus};

use super::PageQuery;
use crate::api::ApiResult;
use crate::db;
use crate::state::AppState;
use crate::tickets::{TicketDocument, document, qr_payload, render_ticket_pdf};
use crate::validation::page_bounds;

#[derive(Debug, Deserialize)]
pub struct TicketQuery {
    pub status: Option<TicketStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/admin/tickets
pub async fn list_tickets(
    State(state): State<AppState>,
    Query(query): Query<TicketQuery>,
) -> ApiResult<Vec<TicketDetail>> {
    let (limit, offset) = page_bounds(query.limit, query.offset);
    Ok(Json(
        db::tickets::list(&state.pool, query.status, limit, offset).await?,
    ))
}

/// GET /api/admin/tickets/{ticket_number}/document
pub async fn ticket_document(
    State(state): State<AppState>,
    Path(ticket_number): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ticket_number = ticket_number.trim().to_uppercase();
    let ticket = db::tickets::find_detail(&state.pool, &ticket_number)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::TicketNotFound))?;

    let config = &state.config;
    let payload = qr_payload(&ticket.ticket_number, &config.ticket_signing_secret);
    let pdf = render_ticket_pdf(&TicketDocument {
        event_name: &config.event_name,
        event_venue: &config.event_venue,
        event_date: &config.event_date,
        attendee_name: &ticket.attendee_name,
        company: ticket.company.as_deref(),
        ticket_type_name: &ticket.ticket_type_name,
        ticket_number: &ticket.ticket_number,
        qr_payload: &payload,
        registration_id: ticket.registration_id,
        issued_at: ticket.created_at,
    })
    .map_err(|e| {
        tracing::error!(ticket_number = %ticket.ticket_number, error = %e, "Ticket PDF rendering failed");
        AppError::new(ErrorCode::InternalError)
    })?;

    let disposition = format!("inline; filename=\"ticket-{}.pdf\"", ticket.ticket_number);
    Ok((
        [
            (header::CONTENT_TYPE, document::CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf,
    ))
}

/// GET /api/admin/email-logs
pub async fn list_email_logs(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Vec<EmailLog>> {
    let (limit, offset) = page_bounds(page.limit, page.offset);
    Ok(Json(db::email_logs::list(&state.pool, limit, offset).await?))
}

/// GET /api/admin/panel-interests
pub async fn list_panel_interests(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> ApiResult<Vec<PanelInterest>> {
    let (limit, offset) = page_bounds(page.limit, page.offset);
    Ok(Json(
        db::panel_interests::list(&state.pool, limit, offset).await?,
    ))
}
