//! Ticket type and coupon administration

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    Coupon, CouponCreate, CouponUpdate, DiscountType, TicketType, TicketTypeCreate,
    TicketTypeUpdate,
};

use crate::db;
use crate::error::{ServiceResult, is_unique_violation};
use crate::pricing::normalize_code;
use crate::state::AppState;
use crate::util::{now_millis, snowflake_id};
use crate::validation::{
    MAX_NAME_LEN, MAX_NOTE_LEN, MAX_QUANTITY, MAX_SHORT_TEXT_LEN, validate_optional_text,
    validate_required_text,
};

// ── Ticket types ──

fn check_price(price: Decimal) -> Result<(), AppError> {
    if price.is_sign_negative() {
        return Err(AppError::validation("price must not be negative"));
    }
    if price.normalize().scale() > 2 {
        return Err(AppError::validation("price has more than 2 decimal places"));
    }
    Ok(())
}

fn check_max_per_order(value: i32) -> Result<(), AppError> {
    if !(1..=MAX_QUANTITY).contains(&value) {
        return Err(AppError::validation(format!(
            "max_per_order must be between 1 and {MAX_QUANTITY}"
        )));
    }
    Ok(())
}

fn validate_ticket_type_create(data: &TicketTypeCreate) -> Result<(), AppError> {
    validate_required_text(&data.name, "name", MAX_NAME_LEN)?;
    validate_optional_text(&data.description, "description", MAX_NOTE_LEN)?;
    check_price(data.price)?;
    if data.total_stock < 0 {
        return Err(AppError::validation("total_stock must not be negative"));
    }
    if let Some(max) = data.max_per_order {
        check_max_per_order(max)?;
    }
    Ok(())
}

fn validate_ticket_type_update(data: &TicketTypeUpdate) -> Result<(), AppError> {
    if let Some(name) = &data.name {
        validate_required_text(name, "name", MAX_NAME_LEN)?;
    }
    validate_optional_text(&data.description, "description", MAX_NOTE_LEN)?;
    if let Some(price) = data.price {
        check_price(price)?;
    }
    if let Some(total) = data.total_stock
        && total < 0
    {
        return Err(AppError::validation("total_stock must not be negative"));
    }
    if let Some(max) = data.max_per_order {
        check_max_per_order(max)?;
    }
    Ok(())
}

pub async fn create_ticket_type(
    state: &AppState,
    data: TicketTypeCreate,
) -> ServiceResult<TicketType> {
    validate_ticket_type_create(&data)?;
    let ticket_type =
        db::ticket_types::create(&state.pool, snowflake_id(), &data, now_millis()).await?;
    tracing::info!(ticket_type_id = ticket_type.id, name = %ticket_type.name, "Ticket type created");
    Ok(ticket_type)
}

/// Update a ticket type. Lowering `total_stock` below reserved + sold fails
/// with `StockBelowCommitted`.
pub async fn update_ticket_type(
    state: &AppState,
    id: i64,
    data: TicketTypeUpdate,
) -> ServiceResult<TicketType> {
    validate_ticket_type_update(&data)?;

    if let Some(updated) = db::ticket_types::update(&state.pool, id, &data, now_millis()).await? {
        tracing::info!(ticket_type_id = id, "Ticket type updated");
        return Ok(updated);
    }

    // No row: either it does not exist or the stock guard refused
    let current = db::ticket_types::find_by_id(&state.pool, id)
        .await?
        .ok_or(ErrorCode::TicketTypeNotFound)?;
    Err(AppError::new(ErrorCode::StockBelowCommitted)
        .with_detail("reserved_stock", current.reserved_stock)
        .with_detail("sold_stock", current.sold_stock)
        .with_detail("minimum_total_stock", current.committed_stock())
        .into())
}

// ── Coupons ──

fn check_discount(discount_type: DiscountType, value: Decimal) -> Result<(), AppError> {
    if value <= Decimal::ZERO {
        return Err(AppError::validation("discount_value must be positive"));
    }
    if discount_type == DiscountType::Percentage && value > Decimal::ONE_HUNDRED {
        return Err(AppError::validation("percentage discount cannot exceed 100"));
    }
    Ok(())
}

fn check_window(valid_from: Option<i64>, valid_until: Option<i64>) -> Result<(), AppError> {
    if let (Some(from), Some(until)) = (valid_from, valid_until)
        && from > until
    {
        return Err(AppError::validation("valid_from must not be after valid_until"));
    }
    Ok(())
}

fn check_positive(value: Option<i32>, field: &str) -> Result<(), AppError> {
    if let Some(v) = value
        && v < 1
    {
        return Err(AppError::validation(format!("{field} must be at least 1")));
    }
    Ok(())
}

fn normalized_coupon_code(raw: &str) -> Result<String, AppError> {
    let code = normalize_code(raw);
    validate_required_text(&code, "code", MAX_SHORT_TEXT_LEN)?;
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(AppError::validation(
            "code may only contain letters, digits, '-' and '_'",
        ));
    }
    Ok(code)
}

async fn check_ticket_type_exists(state: &AppState, id: Option<i64>) -> ServiceResult<()> {
    if let Some(id) = id {
        db::ticket_types::find_by_id(&state.pool, id)
            .await?
            .ok_or(ErrorCode::TicketTypeNotFound)?;
    }
    Ok(())
}

pub async fn create_coupon(state: &AppState, data: CouponCreate) -> ServiceResult<Coupon> {
    let code = normalized_coupon_code(&data.code)?;
    validate_optional_text(&data.description, "description", MAX_NOTE_LEN)?;
    check_discount(data.discount_type, data.discount_value)?;
    check_positive(data.max_uses, "max_uses")?;
    check_positive(data.min_quantity, "min_quantity")?;
    check_window(data.valid_from, data.valid_until)?;
    check_ticket_type_exists(state, data.ticket_type_id).await?;

    match db::coupons::create(&state.pool, snowflake_id(), &code, &data, now_millis()).await {
        Ok(coupon) => {
            tracing::info!(coupon_id = coupon.id, code = %coupon.code, "Coupon created");
            Ok(coupon)
        }
        Err(e) if is_unique_violation(&e) => Err(AppError::new(ErrorCode::CouponCodeExists)
            .with_detail("code", code)
            .into()),
        Err(e) => Err(e.into()),
    }
}

/// Update a coupon. A `max_uses` below the current `used_count` fails with
/// `CouponLimitBelowUsage`.
pub async fn update_coupon(state: &AppState, id: i64, data: CouponUpdate) -> ServiceResult<Coupon> {
    let current = db::coupons::find_by_id(&state.pool, id)
        .await?
        .ok_or(ErrorCode::CouponNotFound)?;

    validate_optional_text(&data.description, "description", MAX_NOTE_LEN)?;
    check_discount(
        data.discount_type.unwrap_or(current.discount_type),
        data.discount_value.unwrap_or(current.discount_value),
    )?;
    check_positive(data.max_uses.flatten(), "max_uses")?;
    check_positive(data.min_quantity.flatten(), "min_quantity")?;
    check_window(
        data.valid_from.unwrap_or(current.valid_from),
        data.valid_until.unwrap_or(current.valid_until),
    )?;
    check_ticket_type_exists(state, data.ticket_type_id.flatten()).await?;

    if let Some(updated) = db::coupons::update(&state.pool, id, &data, now_millis()).await? {
        tracing::info!(coupon_id = id, "Coupon updated");
        return Ok(updated);
    }

    // The row exists, so the usage guard refused. Re-read for the live count.
    let used_count = db::coupons::find_by_id(&state.pool, id)
        .await?
        .map(|c| c.used_count)
        .unwrap_or(current.used_count);
    Err(AppError::new(ErrorCode::CouponLimitBelowUsage)
        .with_detail("used_count", used_count)
        .into())
}

pub async fn deactivate_coupon(state: &AppState, id: i64) -> ServiceResult<()> {
    if !db::coupons::deactivate(&state.pool, id, now_millis()).await? {
        return Err(ErrorCode::CouponNotFound.into());
    }
    tracing::info!(coupon_id = id, "Coupon deactivated");
    Ok(())
}
