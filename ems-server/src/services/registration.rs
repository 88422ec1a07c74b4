//! Public registration flow
//!
//! Stock and the coupon use are taken in the same transaction that inserts
//! the registration. A free order is confirmed inside it too; a paid order
//! gets its Stripe Checkout Session after commit.

use serde::{Deserialize, Serialize};
use shared::error::{AppError, ErrorCode};
use shared::models::{Coupon, Registration, RegistrationStatus, Ticket, TicketType};
use validator::Validate;

use super::fulfillment;
use crate::db;
use crate::db::registrations::NewRegistration;
use crate::error::ServiceResult;
use crate::pricing::{self, CouponDiscount, CouponRejection, PriceQuote};
use crate::state::AppState;
use crate::stripe::{self, CheckoutRequest};
use crate::util::{now_millis, snowflake_id};
use crate::validation::{MAX_NAME_LEN, validate_request};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegistrationRequest {
    #[validate(length(min = 1, max = 200))]
    pub first_name: String,
    #[validate(length(min = 1, max = 200))]
    pub last_name: String,
    #[validate(email, length(max = 254))]
    pub email: String,
    #[validate(length(max = 100))]
    pub phone: Option<String>,
    #[validate(length(max = 200))]
    pub company: Option<String>,
    pub ticket_type_id: i64,
    #[validate(range(min = 1, max = 50))]
    pub quantity: i32,
    #[validate(length(max = 64))]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub is_ems_client: bool,
    /// Optional name per ticket, in ticket order
    #[serde(default)]
    pub attendee_names: Vec<String>,
}

impl RegistrationRequest {
    fn check(&self) -> Result<(), AppError> {
        validate_request(self)?;
        if self.first_name.trim().is_empty() || self.last_name.trim().is_empty() {
            return Err(AppError::validation("first_name and last_name must not be blank"));
        }
        if !self.attendee_names.is_empty() {
            if self.attendee_names.len() != self.quantity as usize {
                return Err(AppError::validation(format!(
                    "attendee_names has {} entries, expected {}",
                    self.attendee_names.len(),
                    self.quantity
                )));
            }
            if self.attendee_names.iter().any(|n| n.len() > MAX_NAME_LEN) {
                return Err(AppError::validation("attendee name is too long"));
            }
        }
        Ok(())
    }

    fn coupon_code(&self) -> Option<String> {
        self.coupon_code
            .as_deref()
            .map(pricing::normalize_code)
            .filter(|c| !c.is_empty())
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// What the registrant sees next
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RegistrationOutcome {
    Confirmed {
        registration_id: i64,
        quote: PriceQuote,
        tickets: Vec<Ticket>,
    },
    PendingPayment {
        registration_id: i64,
        quote: PriceQuote,
        checkout_url: String,
        expires_at: i64,
    },
}

fn check_ticket_type(ticket_type: &TicketType, quantity: i32) -> Result<(), AppError> {
    if !ticket_type.is_active {
        return Err(AppError::new(ErrorCode::TicketTypeInactive));
    }
    if quantity > ticket_type.max_per_order {
        return Err(AppError::new(ErrorCode::QuantityExceedsLimit)
            .with_detail("max_per_order", ticket_type.max_per_order));
    }
    Ok(())
}

/// Create a registration. See the module docs for the transaction layout.
pub async fn create_registration(
    state: &AppState,
    req: RegistrationRequest,
) -> ServiceResult<RegistrationOutcome> {
    req.check()?;

    let now = now_millis();
    let registration_id = snowflake_id();
    let email = req.email.trim().to_lowercase();
    let coupon_code = if req.is_ems_client {
        None
    } else {
        req.coupon_code()
    };

    let mut tx = state.pool.begin().await?;

    let ticket_type = db::ticket_types::find_by_id_in_tx(&mut tx, req.ticket_type_id)
        .await?
        .ok_or(ErrorCode::TicketTypeNotFound)?;
    check_ticket_type(&ticket_type, req.quantity)?;

    if !db::ticket_types::reserve_in_tx(&mut tx, ticket_type.id, req.quantity, now).await? {
        return Err(AppError::new(ErrorCode::TicketSoldOut)
            .with_detail("available_stock", ticket_type.available_stock())
            .into());
    }

    let coupon: Option<Coupon> = match &coupon_code {
        Some(code) => {
            let coupon = db::coupons::find_by_code_in_tx(&mut tx, code)
                .await?
                .ok_or(ErrorCode::CouponNotFound)?;
            pricing::check_eligibility(&coupon, ticket_type.id, req.quantity, now)
                .map_err(AppError::from)?;
            if !db::coupons::claim_in_tx(&mut tx, coupon.id, now).await? {
                return Err(AppError::from(CouponRejection::UsageLimitReached).into());
            }
            Some(coupon)
        }
        None => None,
    };

    let quote = pricing::quote(
        ticket_type.price,
        req.quantity,
        coupon.as_ref().map(CouponDiscount::from).as_ref(),
        req.is_ems_client,
    );
    let expires_at = now + state.config.reservation_ttl_millis();

    db::registrations::insert_in_tx(
        &mut tx,
        &NewRegistration {
            id: registration_id,
            first_name: req.first_name.trim(),
            last_name: req.last_name.trim(),
            email: &email,
            phone: non_blank(&req.phone),
            company: non_blank(&req.company),
            is_ems_client: req.is_ems_client,
            ticket_type_id: ticket_type.id,
            quantity: req.quantity,
            attendee_names: &req.attendee_names,
            coupon_id: coupon.as_ref().map(|c| c.id),
            coupon_code: coupon.as_ref().map(|c| c.code.as_str()),
            unit_price: quote.unit_price,
            subtotal: quote.subtotal,
            discount: quote.discount,
            total: quote.total,
            status: RegistrationStatus::PendingPayment,
            expires_at: Some(expires_at),
            now,
        },
    )
    .await?;

    if let Some(coupon) = &coupon {
        db::coupons::insert_redemption_in_tx(&mut tx, snowflake_id(), coupon.id, registration_id, now)
            .await?;
    }

    if quote.is_free() {
        let (registration, tickets) = fulfillment::confirm_pending_in_tx(
            &mut tx,
            registration_id,
            &state.config.ticket_prefix,
            now,
        )
        .await?
        .ok_or_else(|| AppError::internal("Free registration vanished before confirmation"))?;
        tx.commit().await?;

        tracing::info!(
            registration_id,
            ticket_type_id = ticket_type.id,
            quantity = req.quantity,
            free_reason = ?quote.free_reason,
            "Free registration confirmed"
        );
        fulfillment::notify_confirmed(state, &registration, &tickets).await;

        return Ok(RegistrationOutcome::Confirmed {
            registration_id,
            quote,
            tickets,
        });
    }

    tx.commit().await?;
    tracing::info!(
        registration_id,
        ticket_type_id = ticket_type.id,
        quantity = req.quantity,
        coupon_id = ?coupon.as_ref().map(|c| c.id),
        total = %quote.total,
        "Registration reserved, awaiting payment"
    );

    let (checkout_url, expires_at) =
        start_checkout(state, registration_id, &email, &ticket_type, &quote, expires_at).await?;

    Ok(RegistrationOutcome::PendingPayment {
        registration_id,
        quote,
        checkout_url,
        expires_at,
    })
}

/// Open a Checkout Session and record the pending payment. Returns the
/// checkout URL and the final hold expiry (ms).
///
/// The session expiry is computed from the clock right before the Stripe call
/// and stored on the registration, so the sweeper and Stripe agree. On any
/// failure the reservation is released so the stock is not held for nothing.
async fn start_checkout(
    state: &AppState,
    registration_id: i64,
    email: &str,
    ticket_type: &TicketType,
    quote: &PriceQuote,
    reserved_until: i64,
) -> ServiceResult<(String, i64)> {
    let config = &state.config;
    let description = format!("{} x {}", ticket_type.name, quote.quantity);

    let Some(amount_minor) = pricing::to_minor_units(quote.total) else {
        tracing::error!(registration_id, total = %quote.total, "Order total out of range for Stripe");
        return abandon_checkout(state, registration_id, None).await;
    };

    let expires_at = stripe::checkout_expires_at(reserved_until, now_millis());
    let hold_until = expires_at * 1000;
    if hold_until > reserved_until
        && !db::registrations::extend_hold(&state.pool, registration_id, hold_until, now_millis())
            .await?
    {
        return Err(AppError::with_message(
            ErrorCode::RegistrationNotPending,
            "Registration was released before checkout opened",
        )
        .into());
    }

    let session = match state
        .stripe
        .create_checkout_session(&CheckoutRequest {
            registration_id,
            customer_email: email,
            description: &description,
            amount_minor,
            currency: &config.currency,
            success_url: &config.checkout_success_url,
            cancel_url: &config.checkout_cancel_url,
            expires_at,
        })
        .await
    {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(registration_id, error = %e, "Checkout session creation failed");
            return abandon_checkout(state, registration_id, None).await;
        }
    };

    if let Err(e) = db::payments::insert(
        &state.pool,
        snowflake_id(),
        registration_id,
        &session.id,
        quote.total,
        &config.currency,
        now_millis(),
    )
    .await
    {
        tracing::error!(
            registration_id,
            session_id = %session.id,
            error = %e,
            "Could not record checkout session, closing it"
        );
        return abandon_checkout(state, registration_id, Some(&session.id)).await;
    }

    Ok((session.url, hold_until))
}

/// Give up on a checkout: an opened session is expired at Stripe first so it
/// can no longer be paid, then the reservation is released.
async fn abandon_checkout<T>(
    state: &AppState,
    registration_id: i64,
    session_id: Option<&str>,
) -> ServiceResult<T> {
    if let Some(session_id) = session_id
        && let Err(e) = state.stripe.expire_checkout_session(session_id).await
    {
        tracing::error!(
            registration_id,
            session_id,
            error = %e,
            "Unrecorded checkout session is still open and payable"
        );
    }
    fulfillment::release_reservation(state, registration_id, RegistrationStatus::Cancelled).await?;
    Err(AppError::new(ErrorCode::PaymentSetupFailed).into())
}

/// `POST /api/coupons/validate` input
#[derive(Debug, Deserialize, Validate)]
pub struct CouponCheckRequest {
    #[validate(length(min = 1, max = 64))]
    pub code: String,
    pub ticket_type_id: i64,
    #[validate(range(min = 1, max = 50))]
    pub quantity: i32,
}

#[derive(Debug, Serialize)]
pub struct CouponCheck {
    pub valid: bool,
    pub code: String,
    /// Adds `reason` (and `min_quantity`) when the coupon is rejected
    #[serde(flatten)]
    pub rejection: Option<CouponRejection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub quote: PriceQuote,
}

/// Price an order with a coupon without reserving anything.
pub async fn check_coupon(state: &AppState, req: CouponCheckRequest) -> ServiceResult<CouponCheck> {
    validate_request(&req)?;
    let code = pricing::normalize_code(&req.code);

    let ticket_type = db::ticket_types::find_by_id(&state.pool, req.ticket_type_id)
        .await?
        .ok_or(ErrorCode::TicketTypeNotFound)?;
    check_ticket_type(&ticket_type, req.quantity)?;

    let coupon = db::coupons::find_by_code(&state.pool, &code)
        .await?
        .ok_or(ErrorCode::CouponNotFound)?;

    let rejection =
        pricing::check_eligibility(&coupon, ticket_type.id, req.quantity, now_millis()).err();
    let discount = rejection.is_none().then(|| CouponDiscount::from(&coupon));
    let quote = pricing::quote(ticket_type.price, req.quantity, discount.as_ref(), false);

    Ok(CouponCheck {
        valid: rejection.is_none(),
        code,
        message: rejection.map(|r| r.error_code().message()),
        rejection,
        description: coupon.description,
        quote,
    })
}

/// Checkout success page view
#[derive(Debug, Serialize)]
pub struct RegistrationView {
    pub registration: Registration,
    pub ticket_type_name: String,
    pub tickets: Vec<Ticket>,
}

/// Look up a registration by its Stripe Checkout Session id.
pub async fn find_by_session(state: &AppState, session_id: &str) -> ServiceResult<RegistrationView> {
    let payment = db::payments::find_by_session(&state.pool, session_id)
        .await?
        .ok_or(ErrorCode::RegistrationNotFound)?;
    let registration = db::registrations::find_by_id(&state.pool, payment.registration_id)
        .await?
        .ok_or(ErrorCode::RegistrationNotFound)?;
    let ticket_type_name = db::ticket_types::find_by_id(&state.pool, registration.ticket_type_id)
        .await?
        .map(|t| t.name)
        .unwrap_or_default();
    let tickets = db::tickets::list_by_registration(&state.pool, registration.id).await?;

    Ok(RegistrationView {
        registration,
        ticket_type_name,
        tickets,
    })
}
