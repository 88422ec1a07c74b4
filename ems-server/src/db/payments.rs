use rust_decimal::Decimal;
use shared::models::Payment;
use sqlx::{PgConnection, PgPool};

pub async fn insert(
    pool: &PgPool,
    id: i64,
    registration_id: i64,
    stripe_session_id: &str,
    amount: Decimal,
    currency: &str,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO payments
            (id, registration_id, stripe_session_id, amount, currency, status, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, 'PENDING', $6, $6)",
    )
    .bind(id)
    .bind(registration_id)
    .bind(stripe_session_id)
    .bind(amount)
    .bind(currency)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn find_by_session(
    pool: &PgPool,
    stripe_session_id: &str,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments WHERE stripe_session_id = $1")
        .bind(stripe_session_id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_session_in_tx(
    conn: &mut PgConnection,
    stripe_session_id: &str,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments WHERE stripe_session_id = $1")
        .bind(stripe_session_id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn list_by_registration(
    pool: &PgPool,
    registration_id: i64,
) -> Result<Vec<Payment>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM payments WHERE registration_id = $1 ORDER BY created_at")
        .bind(registration_id)
        .fetch_all(pool)
        .await
}

/// The settled payment of a registration, if any
pub async fn find_paid(pool: &PgPool, registration_id: i64) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as(
        "SELECT * FROM payments WHERE registration_id = $1 AND status = 'PAID'
         ORDER BY updated_at DESC LIMIT 1",
    )
    .bind(registration_id)
    .fetch_optional(pool)
    .await
}

/// `PENDING | EXPIRED | FAILED -> PAID`. A late payment on a session we
/// already gave up on is still recorded so it can be refunded.
pub async fn mark_paid_in_tx(
    conn: &mut PgConnection,
    stripe_session_id: &str,
    payment_intent: Option<&str>,
    now: i64,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE payments
         SET status = 'PAID', stripe_payment_intent = COALESCE($2, stripe_payment_intent), updated_at = $3
         WHERE stripe_session_id = $1 AND status IN ('PENDING', 'EXPIRED', 'FAILED')
         RETURNING *",
    )
    .bind(stripe_session_id)
    .bind(payment_intent)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await
}

/// `PENDING -> EXPIRED` for every open session of a registration.
/// Returns the expired rows so their Stripe sessions can be closed too.
pub async fn expire_pending_in_tx(
    conn: &mut PgConnection,
    registration_id: i64,
    now: i64,
) -> Result<Vec<Payment>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE payments SET status = 'EXPIRED', updated_at = $2
         WHERE registration_id = $1 AND status = 'PENDING'
         RETURNING *",
    )
    .bind(registration_id)
    .bind(now)
    .fetch_all(&mut *conn)
    .await
}

/// `PAID -> REFUNDED` by payment intent (webhook path)
pub async fn mark_refunded_in_tx(
    conn: &mut PgConnection,
    payment_intent: &str,
    now: i64,
) -> Result<Option<Payment>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE payments SET status = 'REFUNDED', updated_at = $2
         WHERE stripe_payment_intent = $1 AND status = 'PAID'
         RETURNING *",
    )
    .bind(payment_intent)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await
}

/// `PAID -> REFUNDED` by id (admin cancellation path)
pub async fn mark_refunded(pool: &PgPool, id: i64, now: i64) -> Result<bool, sqlx::Error> {
    let rows = sqlx::query(
        "UPDATE payments SET status = 'REFUNDED', updated_at = $2
         WHERE id = $1 AND status = 'PAID'",
    )
    .bind(id)
    .bind(now)
    .execute(pool)
    .await?
    .rows_affected();
    Ok(rows == 1)
}

/// Mark a session `FAILED` (async payment failure)
pub async fn mark_failed_in_tx(
    conn: &mut PgConnection,
    stripe_session_id: &str,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let rows = sqlx::query(
        "UPDATE payments SET status = 'FAILED', updated_at = $2
         WHERE stripe_session_id = $1 AND status = 'PENDING'",
    )
    .bind(stripe_session_id)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .rows_affected();
    Ok(rows == 1)
}
