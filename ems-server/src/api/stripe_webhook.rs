//! Stripe webhook handler
//!
//! POST /stripe/webhook: raw body for signature verification.
//!
//! The event id is recorded in the same transaction as the state change it
//! causes. A handler error rolls both back and returns 500, so Stripe's retry
//! runs the event again. Emails and Stripe calls happen after commit.

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::routing::post;
use http::{HeaderMap, StatusCode};
use rust_decimal::Decimal;
use serde_json::Value;
use shared::error::AppError;
use shared::models::{Registration, RegistrationStatus, Ticket};
use sqlx::PgConnection;

use crate::db;
use crate::error::ServiceResult;
use crate::security_log;
use crate::services::fulfillment::{self, Finalized};
use crate::state::AppState;
use crate::stripe;
use crate::util::now_millis;

pub fn router() -> Router<AppState> {
    Router::new().route("/stripe/webhook", post(handle_webhook))
}

/// Work left for after the transaction commits
enum FollowUp {
    None,
    SendTickets {
        registration: Registration,
        tickets: Vec<Ticket>,
    },
    RefundEmail {
        registration: Registration,
        amount: Decimal,
    },
    ExpireSessions(Vec<String>),
}

/// Handle incoming Stripe webhook events
pub async fn handle_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let Some(sig_header) = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
    else {
        security_log!("WARN", "webhook_signature_missing");
        return StatusCode::BAD_REQUEST;
    };

    if let Err(e) =
        stripe::verify_webhook_signature(&body, sig_header, &state.config.stripe_webhook_secret)
    {
        security_log!("WARN", "webhook_signature_invalid", reason = e);
        return StatusCode::BAD_REQUEST;
    }

    let event: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(%e, "Failed to parse webhook JSON");
            return StatusCode::BAD_REQUEST;
        }
    };

    let Some(event_id) = event["id"].as_str() else {
        tracing::warn!("Webhook event missing id");
        return StatusCode::BAD_REQUEST;
    };
    let event_type = event["type"].as_str().unwrap_or("");
    tracing::info!(event_id, event_type, "Received Stripe webhook");

    match process(&state, event_id, event_type, &event).await {
        Ok(follow_up) => {
            run_follow_up(&state, follow_up).await;
            StatusCode::OK
        }
        Err(e) => {
            let e: AppError = e.into();
            tracing::error!(event_id, event_type, error = %e, "Webhook processing failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

async fn process(
    state: &AppState,
    event_id: &str,
    event_type: &str,
    event: &Value,
) -> ServiceResult<FollowUp> {
    let now = now_millis();
    let mut tx = state.pool.begin().await?;

    if !db::webhook_events::record_in_tx(&mut tx, event_id, event_type, now).await? {
        tracing::info!(event_id, "Duplicate webhook event, skipping");
        return Ok(FollowUp::None);
    }

    let object = &event["data"]["object"];
    let follow_up = match event_type {
        "checkout.session.completed" | "checkout.session.async_payment_succeeded" => {
            checkout_paid(state, &mut tx, object, now).await?
        }
        "checkout.session.async_payment_failed" => {
            if let Some(session_id) = object["id"].as_str()
                && db::payments::mark_failed_in_tx(&mut tx, session_id, now).await?
            {
                tracing::warn!(session_id, "Asynchronous payment failed");
            }
            FollowUp::None
        }
        "checkout.session.expired" => checkout_expired(state, &mut tx, object, now).await?,
        "charge.refunded" => charge_refunded(&mut tx, object, now).await?,
        _ => {
            tracing::debug!(event_type, "Unhandled webhook event type");
            FollowUp::None
        }
    };

    tx.commit().await?;
    Ok(follow_up)
}

/// checkout.session.completed / async_payment_succeeded: confirm the registration
async fn checkout_paid(
    state: &AppState,
    conn: &mut PgConnection,
    session: &Value,
    now: i64,
) -> ServiceResult<FollowUp> {
    let Some(session_id) = session["id"].as_str() else {
        tracing::warn!("Checkout session event missing id");
        return Ok(FollowUp::None);
    };
    // Delayed methods complete with `unpaid` and follow up with async_payment_succeeded
    if session["payment_status"].as_str() != Some("paid") {
        tracing::info!(session_id, payment_status = ?session["payment_status"].as_str(), "Checkout completed without payment yet");
        return Ok(FollowUp::None);
    }
    let payment_intent = session["payment_intent"].as_str();

    match fulfillment::finalize_paid_in_tx(
        conn,
        session_id,
        payment_intent,
        &state.config.ticket_prefix,
        now,
    )
    .await?
    {
        Finalized::Confirmed {
            registration,
            tickets,
        } => Ok(FollowUp::SendTickets {
            registration,
            tickets,
        }),
        Finalized::AlreadyProcessed => {
            tracing::info!(session_id, "Checkout session already settled");
            Ok(FollowUp::None)
        }
        Finalized::UnknownSession => {
            tracing::error!(
                session_id,
                registration_ref = ?session["client_reference_id"].as_str(),
                amount_total = ?session["amount_total"].as_i64(),
                payment_intent = ?payment_intent,
                "Payment received for an unrecorded checkout session, refund manually"
            );
            Ok(FollowUp::None)
        }
        Finalized::Orphaned { payment } => {
            tracing::error!(
                session_id,
                registration_id = payment.registration_id,
                amount = %payment.amount,
                payment_intent = ?payment.stripe_payment_intent,
                "Payment received for a registration that is no longer pending, refund manually"
            );
            Ok(FollowUp::None)
        }
    }
}

/// checkout.session.expired: give the reservation back
async fn checkout_expired(
    state: &AppState,
    conn: &mut PgConnection,
    session: &Value,
    now: i64,
) -> ServiceResult<FollowUp> {
    let Some(session_id) = session["id"].as_str() else {
        return Ok(FollowUp::None);
    };
    let Some(payment) = db::payments::find_by_session(&state.pool, session_id).await? else {
        tracing::info!(session_id, "Expired session unknown");
        return Ok(FollowUp::None);
    };

    let released =
        fulfillment::release_in_tx(conn, payment.registration_id, RegistrationStatus::Expired, now)
            .await?;
    Ok(match released {
        Some(released) => FollowUp::ExpireSessions(
            released
                .open_sessions
                .into_iter()
                .filter(|s| s != session_id)
                .collect(),
        ),
        None => FollowUp::None,
    })
}

/// charge.refunded: only a full refund cancels the registration
async fn charge_refunded(
    conn: &mut PgConnection,
    charge: &Value,
    now: i64,
) -> ServiceResult<FollowUp> {
    let Some(payment_intent) = charge["payment_intent"].as_str() else {
        return Ok(FollowUp::None);
    };
    if charge["refunded"].as_bool() != Some(true) {
        tracing::info!(payment_intent, "Partial refund, registration kept");
        return Ok(FollowUp::None);
    }

    Ok(
        match fulfillment::apply_refund_in_tx(conn, payment_intent, now).await? {
            Some((registration, payment)) => FollowUp::RefundEmail {
                registration,
                amount: payment.amount,
            },
            None => FollowUp::None,
        },
    )
}

async fn run_follow_up(state: &AppState, follow_up: FollowUp) {
    match follow_up {
        FollowUp::None => {}
        FollowUp::SendTickets {
            registration,
            tickets,
        } => fulfillment::notify_confirmed(state, &registration, &tickets).await,
        FollowUp::RefundEmail {
            registration,
            amount,
        } => {
            if let Err(e) = state.email.send_refund_processed(&registration, amount).await {
                tracing::warn!(registration_id = registration.id, error = %e, "Refund email not sent");
            }
        }
        FollowUp::ExpireSessions(sessions) => {
            for session_id in sessions {
                if let Err(e) = state.stripe.expire_checkout_session(&session_id).await {
                    tracing::warn!(session_id = %session_id, error = %e, "Failed to expire checkout session");
                }
            }
        }
    }
}
