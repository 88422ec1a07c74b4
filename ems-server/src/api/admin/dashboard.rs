//! Dashboard figures

use axum::Json;
use axum::extract::State;
use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::{CouponUsage, RegistrationStatusCount, StockSummary, TicketCounts};

use crate::api::ApiResult;
use crate::db;
use crate::state::AppState;

/// Coupons shown in the usage list
const TOP_COUPONS: i64 = 10;

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub registrations: Vec<RegistrationStatusCount>,
    pub confirmed_revenue: Decimal,
    pub currency: String,
    pub tickets: TicketCounts,
    pub stock: Vec<StockSummary>,
    pub top_coupons: Vec<CouponUsage>,
    pub panel_interests: i64,
}

/// GET /api/admin/dashboard
pub async fn get(State(state): State<AppState>) -> ApiResult<Dashboard> {
    let pool = &state.pool;
    let (registrations, confirmed_revenue, tickets, ticket_types, top_coupons, panel_interests) = tokio::try_join!(
        db::registrations::status_counts(pool),
        db::registrations::confirmed_revenue(pool),
        db::tickets::counts(pool),
        db::ticket_types::list_all(pool),
        db::coupons::usage_top(pool, TOP_COUPONS),
        db::panel_interests::count(pool),
    )?;

    Ok(Json(Dashboard {
        registrations,
        confirmed_revenue,
        currency: state.config.currency.to_uppercase(),
        tickets,
        stock: ticket_types.iter().map(StockSummary::from).collect(),
        top_coupons,
        panel_interests,
    }))
}
