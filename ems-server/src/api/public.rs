//! Public registration endpoints (no auth, rate limited per IP)

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use serde::{Deserialize, Serialize};
use shared::models::{PanelInterest, TicketTypePublic};
use validator::Validate;

use super::ApiResult;
use crate::auth::rate_limit::{
    coupon_validate_rate_limit, panel_interest_rate_limit, registration_rate_limit,
};
use crate::db;
use crate::db::panel_interests::NewPanelInterest;
use crate::services::registration::{
    self, CouponCheck, CouponCheckRequest, RegistrationOutcome, RegistrationRequest,
    RegistrationView,
};
use crate::state::AppState;
use crate::util::{now_millis, snowflake_id};
use crate::validation::validate_request;

pub fn router(state: &AppState) -> Router<AppState> {
    let registrations = Router::new()
        .route("/api/registrations", post(create_registration))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            registration_rate_limit,
        ));

    let coupons = Router::new()
        .route("/api/coupons/validate", post(validate_coupon))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            coupon_validate_rate_limit,
        ));

    let panel = Router::new()
        .route("/api/panel-interest", post(submit_panel_interest))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            panel_interest_rate_limit,
        ));

    Router::new()
        .route("/api/ticket-types", get(list_ticket_types))
        .route(
            "/api/registrations/by-session/{session_id}",
            get(registration_by_session),
        )
        .merge(registrations)
        .merge(coupons)
        .merge(panel)
}

/// GET /api/ticket-types
pub async fn list_ticket_types(State(state): State<AppState>) -> ApiResult<Vec<TicketTypePublic>> {
    let types = db::ticket_types::list_active(&state.pool).await?;
    Ok(Json(types.iter().map(TicketTypePublic::from).collect()))
}

/// POST /api/coupons/validate
pub async fn validate_coupon(
    State(state): State<AppState>,
    Json(req): Json<CouponCheckRequest>,
) -> ApiResult<CouponCheck> {
    Ok(Json(registration::check_coupon(&state, req).await?))
}

/// POST /api/registrations
pub async fn create_registration(
    State(state): State<AppState>,
    Json(req): Json<RegistrationRequest>,
) -> ApiResult<RegistrationOutcome> {
    Ok(Json(registration::create_registration(&state, req).await?))
}

/// GET /api/registrations/by-session/{session_id}
pub async fn registration_by_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<RegistrationView> {
    Ok(Json(registration::find_by_session(&state, &session_id).await?))
}

#[derive(Debug, Deserialize, Validate)]
pub struct PanelInterestRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email, length(max = 254))]
    pub email: String,
    #[validate(length(max = 100))]
    pub phone: Option<String>,
    #[validate(length(max = 200))]
    pub company: Option<String>,
    #[validate(length(max = 200))]
    pub topic: Option<String>,
    #[validate(length(max = 2000))]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PanelInterestAck {
    pub id: i64,
    pub received: bool,
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// POST /api/panel-interest
pub async fn submit_panel_interest(
    State(state): State<AppState>,
    Json(req): Json<PanelInterestRequest>,
) -> ApiResult<PanelInterestAck> {
    validate_request(&req)?;
    let name = req.name.trim();
    if name.is_empty() {
        return Err(shared::error::AppError::validation("name must not be blank"));
    }
    let email = req.email.trim().to_lowercase();

    let interest: PanelInterest = db::panel_interests::insert(
        &state.pool,
        &NewPanelInterest {
            id: snowflake_id(),
            name,
            email: &email,
            phone: trimmed(&req.phone),
            company: trimmed(&req.company),
            topic: trimmed(&req.topic),
            message: trimmed(&req.message),
            now: now_millis(),
        },
    )
    .await?;
    tracing::info!(panel_interest_id = interest.id, "Panel interest received");

    if let Err(e) = state.email.send_panel_interest_ack(&interest).await {
        tracing::warn!(panel_interest_id = interest.id, error = %e, "Panel interest ack not sent");
    }

    Ok(Json(PanelInterestAck {
        id: interest.id,
        received: true,
    }))
}
