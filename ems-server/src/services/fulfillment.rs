//! Registration state transitions
//!
//! Shared by the public registration flow, the Stripe webhook, the expiry
//! sweeper and admin cancellation. Every transition starts with a conditional
//! status update; losing that update means another request already moved the
//! registration and the caller backs off.
//!
//! The `*_in_tx` functions never talk to Stripe or SES. Network calls happen
//! after commit.

use rust_decimal::Decimal;
use serde::Serialize;
use shared::error::{AppError, ErrorCode};
use shared::models::{Payment, Registration, RegistrationStatus, Ticket};
use sqlx::PgConnection;

use crate::db;
use crate::error::ServiceResult;
use crate::state::AppState;
use crate::tickets::generate_ticket_number;
use crate::util::{now_millis, snowflake_id};

/// Fresh numbers tried per ticket before giving up
pub const TICKET_NUMBER_ATTEMPTS: usize = 5;

/// Issue one ticket per unit of the registration.
pub async fn issue_tickets_in_tx(
    conn: &mut PgConnection,
    registration: &Registration,
    prefix: &str,
    now: i64,
) -> ServiceResult<Vec<Ticket>> {
    let count = usize::try_from(registration.quantity).unwrap_or(0);
    let mut issued = Vec::with_capacity(count);

    for index in 0..count {
        let attendee = registration.attendee_name(index);
        let mut ticket = None;

        for _ in 0..TICKET_NUMBER_ATTEMPTS {
            let number = generate_ticket_number(prefix);
            ticket = db::tickets::insert_in_tx(
                conn,
                snowflake_id(),
                registration.id,
                registration.ticket_type_id,
                &number,
                &attendee,
                now,
            )
            .await?;
            if ticket.is_some() {
                break;
            }
            tracing::warn!(ticket_number = %number, "Ticket number collision, retrying");
        }

        let ticket = ticket.ok_or_else(|| {
            AppError::internal("Could not allocate a unique ticket number")
        })?;
        issued.push(ticket);
    }

    Ok(issued)
}

/// `PENDING_PAYMENT -> CONFIRMED`: reserved stock becomes sold, the coupon
/// redemption is confirmed and tickets are issued.
///
/// Returns `None` when the registration was no longer pending.
pub async fn confirm_pending_in_tx(
    conn: &mut PgConnection,
    registration_id: i64,
    prefix: &str,
    now: i64,
) -> ServiceResult<Option<(Registration, Vec<Ticket>)>> {
    let Some(registration) = db::registrations::transition_in_tx(
        conn,
        registration_id,
        RegistrationStatus::PendingPayment,
        RegistrationStatus::Confirmed,
        now,
    )
    .await?
    else {
        return Ok(None);
    };

    if !db::ticket_types::commit_reserved_in_tx(
        conn,
        registration.ticket_type_id,
        registration.quantity,
        now,
    )
    .await?
    {
        tracing::error!(
            registration_id,
            ticket_type_id = registration.ticket_type_id,
            quantity = registration.quantity,
            "Reserved stock lower than the confirmed quantity, run stock reconciliation"
        );
    }

    if registration.coupon_id.is_some()
        && !db::coupons::confirm_redemption_in_tx(conn, registration_id, now).await?
    {
        tracing::warn!(registration_id, "No reserved coupon redemption to confirm");
    }

    let tickets = issue_tickets_in_tx(conn, &registration, prefix, now).await?;

    tracing::info!(
        registration_id,
        tickets = tickets.len(),
        "Registration confirmed"
    );
    Ok(Some((registration, tickets)))
}

/// Outcome of a paid checkout session
#[derive(Debug)]
pub enum Finalized {
    Confirmed {
        registration: Registration,
        tickets: Vec<Ticket>,
    },
    /// Session already recorded as paid
    AlreadyProcessed,
    /// Paid session with no payment row; the money needs manual handling
    UnknownSession,
    /// Money arrived for a registration that is no longer pending
    Orphaned { payment: Payment },
}

/// Record the payment of a checkout session and confirm its registration.
pub async fn finalize_paid_in_tx(
    conn: &mut PgConnection,
    session_id: &str,
    payment_intent: Option<&str>,
    prefix: &str,
    now: i64,
) -> ServiceResult<Finalized> {
    let Some(payment) = db::payments::mark_paid_in_tx(conn, session_id, payment_intent, now).await?
    else {
        return Ok(match db::payments::find_by_session_in_tx(conn, session_id).await? {
            Some(_) => Finalized::AlreadyProcessed,
            None => Finalized::UnknownSession,
        });
    };

    match confirm_pending_in_tx(conn, payment.registration_id, prefix, now).await? {
        Some((registration, tickets)) => Ok(Finalized::Confirmed {
            registration,
            tickets,
        }),
        None => Ok(Finalized::Orphaned { payment }),
    }
}

/// What a released reservation leaves behind
#[derive(Debug)]
pub struct Released {
    pub registration: Registration,
    /// Checkout sessions that were still open
    pub open_sessions: Vec<String>,
}

/// `PENDING_PAYMENT -> EXPIRED | CANCELLED`: reserved stock and the coupon
/// use go back, open payments are marked expired.
///
/// Returns `None` when the registration was no longer pending.
pub async fn release_in_tx(
    conn: &mut PgConnection,
    registration_id: i64,
    target: RegistrationStatus,
    now: i64,
) -> ServiceResult<Option<Released>> {
    let Some(registration) = db::registrations::transition_in_tx(
        conn,
        registration_id,
        RegistrationStatus::PendingPayment,
        target,
        now,
    )
    .await?
    else {
        return Ok(None);
    };

    if !db::ticket_types::release_reserved_in_tx(
        conn,
        registration.ticket_type_id,
        registration.quantity,
        now,
    )
    .await?
    {
        tracing::error!(
            registration_id,
            ticket_type_id = registration.ticket_type_id,
            "Reserved stock lower than the released quantity, run stock reconciliation"
        );
    }

    release_coupon_in_tx(conn, registration_id, now).await?;

    let open_sessions = db::payments::expire_pending_in_tx(conn, registration_id, now)
        .await?
        .into_iter()
        .map(|p| p.stripe_session_id)
        .collect();

    tracing::info!(registration_id, status = ?target, "Reservation released");
    Ok(Some(Released {
        registration,
        open_sessions,
    }))
}

async fn release_coupon_in_tx(
    conn: &mut PgConnection,
    registration_id: i64,
    now: i64,
) -> ServiceResult<()> {
    if let Some(coupon_id) =
        db::coupons::release_redemption_in_tx(conn, registration_id, now).await?
        && !db::coupons::unclaim_in_tx(conn, coupon_id, now).await?
    {
        tracing::error!(coupon_id, registration_id, "Coupon used_count already zero, run usage fix-up");
    }
    Ok(())
}

/// Release a pending reservation in its own transaction, then close any open
/// checkout sessions (best effort).
pub async fn release_reservation(
    state: &AppState,
    registration_id: i64,
    target: RegistrationStatus,
) -> ServiceResult<Option<Registration>> {
    let mut tx = state.pool.begin().await?;
    let released = release_in_tx(&mut tx, registration_id, target, now_millis()).await?;
    tx.commit().await?;

    let Some(released) = released else {
        return Ok(None);
    };

    for session_id in &released.open_sessions {
        if let Err(e) = state.stripe.expire_checkout_session(session_id).await {
            tracing::warn!(session_id = %session_id, error = %e, "Failed to expire checkout session");
        }
    }

    Ok(Some(released.registration))
}

/// Stripe reported a full refund of a payment intent: the registration
/// becomes `REFUNDED` and its unused tickets are cancelled.
///
/// Returns the registration and payment when this call made the change.
pub async fn apply_refund_in_tx(
    conn: &mut PgConnection,
    payment_intent: &str,
    now: i64,
) -> ServiceResult<Option<(Registration, Payment)>> {
    let Some(payment) = db::payments::mark_refunded_in_tx(conn, payment_intent, now).await? else {
        return Ok(None);
    };

    let Some(registration) = db::registrations::transition_in_tx(
        conn,
        payment.registration_id,
        RegistrationStatus::Confirmed,
        RegistrationStatus::Refunded,
        now,
    )
    .await?
    else {
        tracing::info!(
            registration_id = payment.registration_id,
            "Refunded payment belongs to a registration that is not confirmed"
        );
        return Ok(None);
    };

    return_unused_tickets_in_tx(conn, &registration, now).await?;

    tracing::info!(registration_id = registration.id, "Registration refunded");
    Ok(Some((registration, payment)))
}

/// Cancel unused tickets and give their stock back. Checked-in tickets keep
/// their sold unit.
async fn return_unused_tickets_in_tx(
    conn: &mut PgConnection,
    registration: &Registration,
    now: i64,
) -> ServiceResult<usize> {
    let cancelled = db::tickets::cancel_issued_in_tx(conn, registration.id).await?;
    let count = i32::try_from(cancelled.len()).unwrap_or(i32::MAX);

    if count > 0
        && !db::ticket_types::return_sold_in_tx(conn, registration.ticket_type_id, count, now)
            .await?
    {
        tracing::error!(
            registration_id = registration.id,
            "Sold stock lower than the cancelled tickets, run stock reconciliation"
        );
    }
    Ok(cancelled.len())
}

/// Refund result reported back to the admin who cancelled
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundOutcome {
    /// Nothing was paid
    NotRequired,
    Refunded { refund_id: String, amount: Decimal },
    /// Stripe refused or was unreachable; refund manually in the dashboard
    Failed { error: String },
}

#[derive(Debug, Serialize)]
pub struct CancelOutcome {
    pub registration: Registration,
    pub tickets_cancelled: usize,
    pub refund: RefundOutcome,
}

/// Admin cancellation.
///
/// - pending: the reservation is released
/// - confirmed: unused tickets are cancelled, their stock and the coupon use
///   go back, and a paid registration is refunded through Stripe
pub async fn cancel_registration(
    state: &AppState,
    registration_id: i64,
) -> ServiceResult<CancelOutcome> {
    let registration = db::registrations::find_by_id(&state.pool, registration_id)
        .await?
        .ok_or(ErrorCode::RegistrationNotFound)?;

    match registration.status {
        RegistrationStatus::PendingPayment => {
            let registration =
                release_reservation(state, registration_id, RegistrationStatus::Cancelled)
                    .await?
                    .ok_or_else(state_changed)?;
            Ok(CancelOutcome {
                registration,
                tickets_cancelled: 0,
                refund: RefundOutcome::NotRequired,
            })
        }
        RegistrationStatus::Confirmed => cancel_confirmed(state, registration_id).await,
        RegistrationStatus::Cancelled
        | RegistrationStatus::Expired
        | RegistrationStatus::Refunded => {
            Err(AppError::new(ErrorCode::RegistrationAlreadyCancelled)
                .with_detail("status", serde_json::json!(registration.status))
                .into())
        }
    }
}

fn state_changed() -> AppError {
    AppError::with_message(
        ErrorCode::RegistrationNotPending,
        "Registration changed state while cancelling, reload and retry",
    )
}

async fn cancel_confirmed(state: &AppState, registration_id: i64) -> ServiceResult<CancelOutcome> {
    let now = now_millis();
    let mut tx = state.pool.begin().await?;

    let registration = db::registrations::transition_in_tx(
        &mut tx,
        registration_id,
        RegistrationStatus::Confirmed,
        RegistrationStatus::Cancelled,
        now,
    )
    .await?
    .ok_or_else(state_changed)?;

    let tickets_cancelled = return_unused_tickets_in_tx(&mut tx, &registration, now).await?;
    release_coupon_in_tx(&mut tx, registration_id, now).await?;
    tx.commit().await?;

    tracing::info!(registration_id, tickets_cancelled, "Confirmed registration cancelled");

    let refund = refund_payment(state, &registration).await?;
    Ok(CancelOutcome {
        registration,
        tickets_cancelled,
        refund,
    })
}

async fn refund_payment(
    state: &AppState,
    registration: &Registration,
) -> ServiceResult<RefundOutcome> {
    let Some(payment) = db::payments::find_paid(&state.pool, registration.id).await? else {
        return Ok(RefundOutcome::NotRequired);
    };

    let Some(intent) = payment.stripe_payment_intent.as_deref() else {
        tracing::error!(payment_id = payment.id, "Paid payment has no payment intent");
        return Ok(RefundOutcome::Failed {
            error: "payment intent unknown".to_string(),
        });
    };

    match state.stripe.create_refund(intent, registration.id).await {
        Ok(refund_id) => {
            db::payments::mark_refunded(&state.pool, payment.id, now_millis()).await?;
            tracing::info!(registration_id = registration.id, refund_id = %refund_id, "Refund created");
            if let Err(e) = state
                .email
                .send_refund_processed(registration, payment.amount)
                .await
            {
                tracing::warn!(registration_id = registration.id, error = %e, "Refund email not sent");
            }
            Ok(RefundOutcome::Refunded {
                refund_id,
                amount: payment.amount,
            })
        }
        Err(e) => {
            tracing::error!(registration_id = registration.id, error = %e, "Stripe refund failed");
            Ok(RefundOutcome::Failed {
                error: e.to_string(),
            })
        }
    }
}

/// Email the tickets of a confirmed registration. Failures are logged only.
pub async fn send_tickets(
    state: &AppState,
    registration: &Registration,
    tickets: &[Ticket],
    resend: bool,
) -> ServiceResult<()> {
    let ticket_type = db::ticket_types::find_by_id(&state.pool, registration.ticket_type_id)
        .await?
        .ok_or(ErrorCode::TicketTypeNotFound)?;
    state
        .email
        .send_tickets(registration, &ticket_type.name, tickets, resend)
        .await
        .map_err(|e| {
            AppError::with_message(ErrorCode::EmailSendFailed, e.to_string()).into()
        })
}

/// Best-effort confirmation email after commit
pub async fn notify_confirmed(state: &AppState, registration: &Registration, tickets: &[Ticket]) {
    if let Err(e) = send_tickets(state, registration, tickets, false).await {
        let e: AppError = e.into();
        tracing::warn!(registration_id = registration.id, error = %e, "Confirmation email not sent");
    }
}
