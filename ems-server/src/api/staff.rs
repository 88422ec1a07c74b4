//! Venue check-in endpoints (STAFF or ADMIN)

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Extension, Json, Router, middleware};
use serde::Deserialize;
use shared::models::TicketDetail;

use super::ApiResult;
use crate::auth::rate_limit::staff_verify_rate_limit;
use crate::auth::{AdminIdentity, admin_auth_middleware};
use crate::services::checkin::{self, CheckInResult};
use crate::state::AppState;

pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/api/staff/verify", post(verify))
        .route("/api/staff/tickets/{ticket_number}", get(lookup))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            staff_verify_rate_limit,
        ))
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    /// QR payload or a typed ticket number
    pub code: String,
}

/// POST /api/staff/verify
pub async fn verify(
    State(state): State<AppState>,
    Extension(identity): Extension<AdminIdentity>,
    Json(req): Json<VerifyRequest>,
) -> ApiResult<CheckInResult> {
    Ok(Json(checkin::verify(&state, &req.code, &identity).await?))
}

/// GET /api/staff/tickets/{ticket_number}
pub async fn lookup(
    State(state): State<AppState>,
    Path(ticket_number): Path<String>,
) -> ApiResult<TicketDetail> {
    Ok(Json(checkin::lookup(&state, &ticket_number).await?))
}
