//! Registration administration

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{
    CouponRedemption, Payment, Registration, RegistrationStatus, RegistrationSummary, Ticket,
    TicketStatus,
};

use crate::api::ApiResult;
use crate::db;
use crate::db::registrations::RegistrationFilter;
use crate::services::fulfillment::{self, CancelOutcome};
use crate::state::AppState;
use crate::validation::page_bounds;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<RegistrationStatus>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RegistrationPage {
    pub items: Vec<RegistrationSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// GET /api/admin/registrations
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> ApiResult<RegistrationPage> {
    let (limit, offset) = page_bounds(query.limit, query.offset);
    let filter = RegistrationFilter {
        status: query.status,
        search: query.search,
        limit,
        offset,
    };
    let (items, total) = tokio::try_join!(
        db::registrations::list(&state.pool, &filter),
        db::registrations::count(&state.pool, &filter),
    )?;
    Ok(Json(RegistrationPage {
        items,
        total,
        limit,
        offset,
    }))
}

#[derive(Debug, Serialize)]
pub struct RegistrationDetail {
    pub registration: Registration,
    pub ticket_type_name: String,
    pub tickets: Vec<Ticket>,
    pub payments: Vec<Payment>,
    pub redemption: Option<CouponRedemption>,
}

/// GET /api/admin/registrations/{id}
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<RegistrationDetail> {
    let registration = db::registrations::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::RegistrationNotFound))?;

    let (ticket_type, tickets, payments, redemption) = tokio::try_join!(
        db::ticket_types::find_by_id(&state.pool, registration.ticket_type_id),
        db::tickets::list_by_registration(&state.pool, id),
        db::payments::list_by_registration(&state.pool, id),
        db::coupons::find_redemption(&state.pool, id),
    )?;

    Ok(Json(RegistrationDetail {
        ticket_type_name: ticket_type.map(|t| t.name).unwrap_or_default(),
        registration,
        tickets,
        payments,
        redemption,
    }))
}

/// POST /api/admin/registrations/{id}/cancel
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<CancelOutcome> {
    Ok(Json(fulfillment::cancel_registration(&state, id).await?))
}

/// POST /api/admin/registrations/{id}/resend-tickets
pub async fn resend_tickets(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    let registration = db::registrations::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::RegistrationNotFound))?;
    if registration.status != RegistrationStatus::Confirmed {
        return Err(AppError::with_message(
            ErrorCode::InvalidRequest,
            "Only confirmed registrations have tickets to send",
        )
        .with_detail("status", serde_json::json!(registration.status)));
    }

    let tickets: Vec<Ticket> = db::tickets::list_by_registration(&state.pool, id)
        .await?
        .into_iter()
        .filter(|t| t.status != TicketStatus::Cancelled)
        .collect();
    fulfillment::send_tickets(&state, &registration, &tickets, true).await?;
    tracing::info!(registration_id = id, tickets = tickets.len(), "Tickets resent");

    Ok(Json(serde_json::json!({
        "registration_id": id,
        "email": registration.email,
        "tickets_sent": tickets.len(),
    })))
}
