//! Ticket types and coupons

use axum::Json;
use axum::extract::{Path, State};
use shared::models::{
    Coupon, CouponCreate, CouponUpdate, CouponUsageFix, StockCorrection, TicketType,
    TicketTypeCreate, TicketTypeUpdate,
};

use crate::api::ApiResult;
use crate::db;
use crate::services::catalog;
use crate::state::AppState;
use crate::util::now_millis;

/// GET /api/admin/ticket-types
pub async fn list_ticket_types(State(state): State<AppState>) -> ApiResult<Vec<TicketType>> {
    Ok(Json(db::ticket_types::list_all(&state.pool).await?))
}

/// POST /api/admin/ticket-types
pub async fn create_ticket_type(
    State(state): State<AppState>,
    Json(data): Json<TicketTypeCreate>,
) -> ApiResult<TicketType> {
    Ok(Json(catalog::create_ticket_type(&state, data).await?))
}

/// PUT /api/admin/ticket-types/{id}
pub async fn update_ticket_type(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(data): Json<TicketTypeUpdate>,
) -> ApiResult<TicketType> {
    Ok(Json(catalog::update_ticket_type(&state, id, data).await?))
}

/// POST /api/admin/ticket-types/reconcile-stock
pub async fn reconcile_stock(State(state): State<AppState>) -> ApiResult<Vec<StockCorrection>> {
    let corrections = db::ticket_types::reconcile(&state.pool, now_millis()).await?;
    if corrections.is_empty() {
        tracing::info!("Stock reconciliation: no drift");
    } else {
        tracing::warn!(corrected = corrections.len(), "Stock counters corrected");
    }
    Ok(Json(corrections))
}

/// GET /api/admin/coupons
pub async fn list_coupons(State(state): State<AppState>) -> ApiResult<Vec<Coupon>> {
    Ok(Json(db::coupons::list(&state.pool).await?))
}

/// POST /api/admin/coupons
pub async fn create_coupon(
    State(state): State<AppState>,
    Json(data): Json<CouponCreate>,
) -> ApiResult<Coupon> {
    Ok(Json(catalog::create_coupon(&state, data).await?))
}

/// PUT /api/admin/coupons/{id}
pub async fn update_coupon(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(data): Json<CouponUpdate>,
) -> ApiResult<Coupon> {
    Ok(Json(catalog::update_coupon(&state, id, data).await?))
}

/// DELETE /api/admin/coupons/{id}
pub async fn deactivate_coupon(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<serde_json::Value> {
    catalog::deactivate_coupon(&state, id).await?;
    Ok(Json(serde_json::json!({ "id": id, "is_active": false })))
}

/// POST /api/admin/coupons/fix-usage
pub async fn fix_coupon_usage(State(state): State<AppState>) -> ApiResult<Vec<CouponUsageFix>> {
    let fixes = db::coupons::fix_usage(&state.pool, now_millis()).await?;
    for fix in &fixes {
        tracing::warn!(
            coupon_id = fix.coupon_id,
            code = %fix.code,
            before = fix.before,
            after = fix.after,
            "Coupon used_count corrected"
        );
    }
    Ok(Json(fixes))
}
