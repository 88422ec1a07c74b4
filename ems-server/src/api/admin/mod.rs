//! Back-office API
//!
//! Everything under `/api/admin` requires an ADMIN JWT, except login.

pub mod catalog;
pub mod dashboard;
pub mod login;
pub mod records;
pub mod registrations;
pub mod users;

use axum::routing::{get, post, put};
use axum::{Router, middleware};
use serde::Deserialize;

use crate::auth::rate_limit::login_rate_limit;
use crate::auth::{admin_auth_middleware, require_admin};
use crate::state::AppState;

/// `?limit=&offset=`
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub fn router(state: &AppState) -> Router<AppState> {
    let login = Router::new()
        .route("/api/admin/login", post(login::login))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            login_rate_limit,
        ));

    let protected = Router::new()
        .route("/api/admin/dashboard", get(dashboard::get))
        // Ticket types
        .route(
            "/api/admin/ticket-types",
            get(catalog::list_ticket_types).post(catalog::create_ticket_type),
        )
        .route("/api/admin/ticket-types/{id}", put(catalog::update_ticket_type))
        .route(
            "/api/admin/ticket-types/reconcile-stock",
            post(catalog::reconcile_stock),
        )
        // Coupons
        .route(
            "/api/admin/coupons",
            get(catalog::list_coupons).post(catalog::create_coupon),
        )
        .route(
            "/api/admin/coupons/{id}",
            put(catalog::update_coupon).delete(catalog::deactivate_coupon),
        )
        .route("/api/admin/coupons/fix-usage", post(catalog::fix_coupon_usage))
        // Registrations
        .route("/api/admin/registrations", get(registrations::list))
        .route("/api/admin/registrations/{id}", get(registrations::detail))
        .route("/api/admin/registrations/{id}/cancel", post(registrations::cancel))
        .route(
            "/api/admin/registrations/{id}/resend-tickets",
            post(registrations::resend_tickets),
        )
        // Tickets
        .route("/api/admin/tickets", get(records::list_tickets))
        .route(
            "/api/admin/tickets/{ticket_number}/document",
            get(records::ticket_document),
        )
        // Users
        .route("/api/admin/users", get(users::list).post(users::create))
        .route("/api/admin/users/{id}", put(users::update))
        // Logs
        .route("/api/admin/email-logs", get(records::list_email_logs))
        .route("/api/admin/panel-interests", get(records::list_panel_interests))
        .route_layer(middleware::from_fn(require_admin))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ));

    Router::new().merge(login).merge(protected)
}
