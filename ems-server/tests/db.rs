//! Tests against a real PostgreSQL database.
//!
//! Set `TEST_DATABASE_URL` to a scratch database to run them; without it
//! every test returns immediately. Migrations are applied on connect. Tests
//! hold `DB_LOCK` because reconciliation locks whole tables.

mod common;

use std::sync::LazyLock;

use axum::body::Body;
use futures::future::join_all;
use http::{Request, StatusCode};
use rust_decimal::Decimal;
use serde_json::json;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    AdminRole, AdminUser, Coupon, CouponCreate, DiscountType, Registration, RegistrationStatus,
    TicketStatus, TicketType, TicketTypeCreate,
};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::{Mutex, MutexGuard};
use tower::ServiceExt;

use common::{JWT_SECRET, bearer, body_json, json_request};
use ems_server::api::create_router;
use ems_server::auth::{AdminIdentity, create_token};
use ems_server::db;
use ems_server::db::registrations::NewRegistration;
use ems_server::services::checkin;
use ems_server::services::fulfillment::{self, Finalized};
use ems_server::services::users::{self, LoginRequest};
use ems_server::state::AppState;
use ems_server::tickets::generate_ticket_number;
use ems_server::util::{hash_password, now_millis, snowflake_id};

static DB_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

async fn setup() -> Option<(MutexGuard<'static, ()>, AppState)> {
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping");
        return None;
    };
    let guard = DB_LOCK.lock().await;
    let pool = PgPoolOptions::new()
        .max_connections(8)
        .connect(&url)
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    Some((guard, common::state(pool, &url)))
}

async fn ticket_type(pool: &PgPool, total_stock: i32) -> TicketType {
    let data = TicketTypeCreate {
        name: format!("Visitor {}", snowflake_id()),
        description: None,
        price: Decimal::new(2500, 2),
        total_stock,
        max_per_order: Some(10),
        sort_order: None,
        is_active: Some(true),
    };
    db::ticket_types::create(pool, snowflake_id(), &data, now_millis())
        .await
        .unwrap()
}

async fn coupon(pool: &PgPool, max_uses: Option<i32>) -> Coupon {
    let code = format!("T{}", snowflake_id());
    let data = CouponCreate {
        code: code.clone(),
        description: None,
        discount_type: DiscountType::Percentage,
        discount_value: Decimal::new(10, 0),
        max_uses,
        min_quantity: None,
        ticket_type_id: None,
        valid_from: None,
        valid_until: None,
        is_active: Some(true),
    };
    db::coupons::create(pool, snowflake_id(), &code, &data, now_millis())
        .await
        .unwrap()
}

/// Reserve stock (and a coupon use) and insert the pending registration,
/// the way checkout does.
async fn pending_registration(
    pool: &PgPool,
    ticket_type: &TicketType,
    quantity: i32,
    coupon: Option<&Coupon>,
) -> Registration {
    let now = now_millis();
    let id = snowflake_id();
    let names: Vec<String> = (1..=quantity).map(|i| format!("Guest {i}")).collect();
    let total = ticket_type.price * Decimal::from(quantity);

    let mut tx = pool.begin().await.unwrap();
    assert!(db::ticket_types::reserve_in_tx(&mut tx, ticket_type.id, quantity, now).await.unwrap());
    let registration = db::registrations::insert_in_tx(
        &mut tx,
        &NewRegistration {
            id,
            first_name: "Maria",
            last_name: "Borg",
            email: "maria@example.com",
            phone: None,
            company: None,
            is_ems_client: false,
            ticket_type_id: ticket_type.id,
            quantity,
            attendee_names: &names,
            coupon_id: coupon.map(|c| c.id),
            coupon_code: coupon.map(|c| c.code.as_str()),
            unit_price: ticket_type.price,
            subtotal: total,
            discount: Decimal::ZERO,
            total,
            status: RegistrationStatus::PendingPayment,
            expires_at: Some(now + 30 * 60 * 1000),
            now,
        },
    )
    .await
    .unwrap();
    if let Some(coupon) = coupon {
        assert!(db::coupons::claim_in_tx(&mut tx, coupon.id, now).await.unwrap());
        db::coupons::insert_redemption_in_tx(&mut tx, snowflake_id(), coupon.id, id, now)
            .await
            .unwrap();
    }
    tx.commit().await.unwrap();
    registration
}

/// A confirmed registration with one issued ticket
async fn issued_ticket(state: &AppState) -> String {
    let ticket_type = ticket_type(&state.pool, 5).await;
    let registration = pending_registration(&state.pool, &ticket_type, 1, None).await;
    let mut tx = state.pool.begin().await.unwrap();
    let (_, tickets) = fulfillment::confirm_pending_in_tx(
        &mut tx,
        registration.id,
        &state.config.ticket_prefix,
        now_millis(),
    )
    .await
    .unwrap()
    .unwrap();
    tx.commit().await.unwrap();
    tickets[0].ticket_number.clone()
}

async fn account(pool: &PgPool, role: AdminRole) -> AdminUser {
    let hash = hash_password("door-password").unwrap();
    let username = format!("staff_{}", snowflake_id());
    db::admin_users::create(pool, snowflake_id(), &username, None, &hash, role, now_millis())
        .await
        .unwrap()
}

fn token_for(user: &AdminUser) -> String {
    create_token(user.id, &user.username, user.role, JWT_SECRET).unwrap()
}

// ========== Stock and coupons ==========

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_reservations_never_oversell() {
    let Some((_guard, state)) = setup().await else { return };
    let ticket_type = ticket_type(&state.pool, 3).await;

    let attempts = (0..5).map(|_| {
        let pool = state.pool.clone();
        let id = ticket_type.id;
        tokio::spawn(async move {
            let mut tx = pool.begin().await.unwrap();
            let reserved = db::ticket_types::reserve_in_tx(&mut tx, id, 1, now_millis())
                .await
                .unwrap();
            tx.commit().await.unwrap();
            reserved
        })
    });
    let granted = join_all(attempts)
        .await
        .into_iter()
        .filter(|r| *r.as_ref().unwrap())
        .count();

    assert_eq!(granted, 3);
    let after = db::ticket_types::find_by_id(&state.pool, ticket_type.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.reserved_stock, 3);

    // Nothing left for a further order of any size
    let mut tx = state.pool.begin().await.unwrap();
    assert!(!db::ticket_types::reserve_in_tx(&mut tx, ticket_type.id, 1, now_millis()).await.unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn coupon_claims_stop_at_max_uses() {
    let Some((_guard, state)) = setup().await else { return };
    let coupon = coupon(&state.pool, Some(3)).await;

    let attempts = (0..4).map(|_| {
        let pool = state.pool.clone();
        let id = coupon.id;
        tokio::spawn(async move {
            let mut tx = pool.begin().await.unwrap();
            let claimed = db::coupons::claim_in_tx(&mut tx, id, now_millis()).await.unwrap();
            tx.commit().await.unwrap();
            claimed
        })
    });
    let granted = join_all(attempts)
        .await
        .into_iter()
        .filter(|r| *r.as_ref().unwrap())
        .count();

    assert_eq!(granted, 3);
    let after = db::coupons::find_by_id(&state.pool, coupon.id).await.unwrap().unwrap();
    assert_eq!(after.used_count, 3);
}

#[tokio::test]
async fn release_returns_stock_and_coupon_once() {
    let Some((_guard, state)) = setup().await else { return };
    let ticket_type = ticket_type(&state.pool, 10).await;
    let coupon = coupon(&state.pool, Some(5)).await;
    let registration = pending_registration(&state.pool, &ticket_type, 2, Some(&coupon)).await;

    for expect_released in [true, false] {
        let mut tx = state.pool.begin().await.unwrap();
        let released = fulfillment::release_in_tx(
            &mut tx,
            registration.id,
            RegistrationStatus::Expired,
            now_millis(),
        )
        .await
        .unwrap();
        tx.commit().await.unwrap();
        assert_eq!(released.is_some(), expect_released);
    }

    let stock = db::ticket_types::find_by_id(&state.pool, ticket_type.id).await.unwrap().unwrap();
    assert_eq!(stock.reserved_stock, 0);
    let coupon = db::coupons::find_by_id(&state.pool, coupon.id).await.unwrap().unwrap();
    assert_eq!(coupon.used_count, 0);
    let registration = db::registrations::find_by_id(&state.pool, registration.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(registration.status, RegistrationStatus::Expired);
}

#[tokio::test]
async fn reconcile_repairs_drifted_counters() {
    let Some((_guard, state)) = setup().await else { return };
    let ticket_type = ticket_type(&state.pool, 10).await;
    pending_registration(&state.pool, &ticket_type, 2, None).await;

    sqlx::query("UPDATE ticket_types SET reserved_stock = 7, sold_stock = 1 WHERE id = $1")
        .bind(ticket_type.id)
        .execute(&state.pool)
        .await
        .unwrap();

    let corrections = db::ticket_types::reconcile(&state.pool, now_millis()).await.unwrap();
    let ours = corrections
        .iter()
        .find(|c| c.ticket_type_id == ticket_type.id)
        .unwrap();
    assert_eq!((ours.reserved_before, ours.reserved_after), (7, 2));
    assert_eq!((ours.sold_before, ours.sold_after), (1, 0));

    let again = db::ticket_types::reconcile(&state.pool, now_millis()).await.unwrap();
    assert!(again.iter().all(|c| c.ticket_type_id != ticket_type.id));
}

#[tokio::test]
async fn usage_fix_counts_live_redemptions() {
    let Some((_guard, state)) = setup().await else { return };
    let ticket_type = ticket_type(&state.pool, 10).await;
    let coupon = coupon(&state.pool, None).await;
    pending_registration(&state.pool, &ticket_type, 1, Some(&coupon)).await;

    sqlx::query("UPDATE coupons SET used_count = 5 WHERE id = $1")
        .bind(coupon.id)
        .execute(&state.pool)
        .await
        .unwrap();

    let fixes = db::coupons::fix_usage(&state.pool, now_millis()).await.unwrap();
    let ours = fixes.iter().find(|f| f.coupon_id == coupon.id).unwrap();
    assert_eq!((ours.before, ours.after), (5, 1));
}

#[tokio::test]
async fn extending_a_hold_never_shortens_it() {
    let Some((_guard, state)) = setup().await else { return };
    let ticket_type = ticket_type(&state.pool, 10).await;
    let registration = pending_registration(&state.pool, &ticket_type, 1, None).await;
    let original = registration.expires_at.unwrap();
    let now = now_millis();

    assert!(db::registrations::extend_hold(&state.pool, registration.id, original + 60_000, now).await.unwrap());
    assert!(db::registrations::extend_hold(&state.pool, registration.id, original - 60_000, now).await.unwrap());
    let held = db::registrations::find_by_id(&state.pool, registration.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(held.expires_at, Some(original + 60_000));

    let mut tx = state.pool.begin().await.unwrap();
    fulfillment::release_in_tx(&mut tx, registration.id, RegistrationStatus::Cancelled, now)
        .await
        .unwrap();
    tx.commit().await.unwrap();
    assert!(!db::registrations::extend_hold(&state.pool, registration.id, original + 120_000, now).await.unwrap());
}

// ========== Payments ==========

#[tokio::test]
async fn paid_session_confirms_once() {
    let Some((_guard, state)) = setup().await else { return };
    let ticket_type = ticket_type(&state.pool, 10).await;
    let registration = pending_registration(&state.pool, &ticket_type, 2, None).await;
    let session_id = format!("cs_test_{}", snowflake_id());
    db::payments::insert(
        &state.pool,
        snowflake_id(),
        registration.id,
        &session_id,
        registration.total,
        "eur",
        now_millis(),
    )
    .await
    .unwrap();

    let mut outcomes = Vec::new();
    for _ in 0..2 {
        let mut tx = state.pool.begin().await.unwrap();
        let outcome = fulfillment::finalize_paid_in_tx(&mut tx, &session_id, Some("pi_test"), "EMS", now_millis())
            .await
            .unwrap();
        tx.commit().await.unwrap();
        outcomes.push(outcome);
    }

    match &outcomes[0] {
        Finalized::Confirmed { tickets, .. } => assert_eq!(tickets.len(), 2),
        other => panic!("expected confirmation, got {other:?}"),
    }
    assert!(matches!(outcomes[1], Finalized::AlreadyProcessed));

    let stock = db::ticket_types::find_by_id(&state.pool, ticket_type.id).await.unwrap().unwrap();
    assert_eq!((stock.reserved_stock, stock.sold_stock), (0, 2));
}

#[tokio::test]
async fn paid_session_without_payment_row_is_flagged() {
    let Some((_guard, state)) = setup().await else { return };
    let session_id = format!("cs_test_{}", snowflake_id());

    let mut tx = state.pool.begin().await.unwrap();
    let outcome = fulfillment::finalize_paid_in_tx(&mut tx, &session_id, None, "EMS", now_millis())
        .await
        .unwrap();

    assert!(matches!(outcome, Finalized::UnknownSession));
}

// ========== Check-in ==========

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_scans_admit_once() {
    let Some((_guard, state)) = setup().await else { return };
    let ticket_number = issued_ticket(&state).await;

    let scans = ["door1", "door2"].map(|door| {
        let state = state.clone();
        let code = ticket_number.to_lowercase();
        tokio::spawn(async move {
            let identity = AdminIdentity {
                user_id: 1,
                username: door.to_string(),
                role: AdminRole::Staff,
            };
            checkin::verify(&state, &code, &identity)
                .await
                .map(|r| r.result)
                .map_err(AppError::from)
        })
    });
    let results: Vec<_> = join_all(scans).await.into_iter().map(|r| r.unwrap()).collect();

    let admitted = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(admitted, 1);
    let refused = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert_eq!(refused.code, ErrorCode::TicketAlreadyCheckedIn);
    assert!(refused.details.as_ref().unwrap().contains_key("checked_in_by"));

    let ticket = checkin::lookup(&state, &ticket_number).await.unwrap();
    assert_eq!(ticket.status, TicketStatus::CheckedIn);
}

#[tokio::test]
async fn unknown_ticket_number_is_not_found() {
    let Some((_guard, state)) = setup().await else { return };
    let identity = AdminIdentity {
        user_id: 1,
        username: "door1".to_string(),
        role: AdminRole::Staff,
    };

    let err = AppError::from(
        checkin::verify(&state, &generate_ticket_number("EMS"), &identity)
            .await
            .unwrap_err(),
    );
    assert_eq!(err.code, ErrorCode::TicketNotFound);
}

// ========== Accounts ==========

#[tokio::test]
async fn login_ignores_username_case() {
    let Some((_guard, state)) = setup().await else { return };
    let username = format!("Door.Staff_{}", snowflake_id());
    let created = users::create_user(
        &state,
        shared::models::AdminUserCreate {
            username: username.clone(),
            email: None,
            password: "door-password".to_string(),
            role: AdminRole::Staff,
        },
    )
    .await
    .unwrap();
    assert_eq!(created.username, username.to_lowercase());

    let response = users::login(
        &state,
        LoginRequest {
            username: format!(" {} ", username.to_uppercase()),
            password: "door-password".to_string(),
        },
    )
    .await
    .unwrap();
    assert_eq!(response.username, created.username);

    let wrong = users::login(
        &state,
        LoginRequest {
            username,
            password: "wrong-password".to_string(),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(AppError::from(wrong).code, ErrorCode::InvalidCredentials);
}

#[tokio::test]
async fn deactivated_account_token_stops_working() {
    let Some((_guard, state)) = setup().await else { return };
    let user = account(&state.pool, AdminRole::Staff).await;
    let token = token_for(&user);
    let app = create_router(state.clone());
    let lookup = || {
        bearer(
            Request::get(format!("/api/staff/tickets/{}", generate_ticket_number("EMS")))
                .body(Body::empty())
                .unwrap(),
            &token,
        )
    };

    let response = app.clone().oneshot(lookup()).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    db::admin_users::update(&state.pool, user.id, None, None, None, Some(false))
        .await
        .unwrap();

    let response = app.oneshot(lookup()).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], 1007);
}

#[tokio::test]
async fn demoted_admin_loses_admin_routes() {
    let Some((_guard, state)) = setup().await else { return };
    let user = account(&state.pool, AdminRole::Admin).await;
    let token = token_for(&user);
    let app = create_router(state.clone());
    let dashboard = || {
        bearer(
            Request::get("/api/admin/dashboard").body(Body::empty()).unwrap(),
            &token,
        )
    };

    let response = app.clone().oneshot(dashboard()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    db::admin_users::update(&state.pool, user.id, None, None, Some(AdminRole::Staff), None)
        .await
        .unwrap();

    let response = app.oneshot(dashboard()).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], 2003);
}

#[tokio::test]
async fn deleted_account_token_is_invalid() {
    let Some((_guard, state)) = setup().await else { return };
    let token = create_token(snowflake_id(), "ghost", AdminRole::Staff, JWT_SECRET).unwrap();

    let response = create_router(state)
        .oneshot(bearer(
            Request::get("/api/admin/dashboard").body(Body::empty()).unwrap(),
            &token,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], 1004);
}

#[tokio::test]
async fn tampered_qr_is_refused_before_lookup() {
    let Some((_guard, state)) = setup().await else { return };
    let user = account(&state.pool, AdminRole::Staff).await;

    let response = create_router(state)
        .oneshot(bearer(
            json_request(
                "POST",
                "/api/staff/verify",
                json!({ "code": "EMS1.EMS-ABCD2345.0000000000000000" }),
            ),
            &token_for(&user),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], 4104);
}
