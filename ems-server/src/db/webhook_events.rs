use sqlx::PgConnection;

/// Record a Stripe event id. Returns `false` if it was already processed.
///
/// Runs inside the event's processing transaction, so a failed handler
/// leaves no record and Stripe's retry is processed again.
pub async fn record_in_tx(
    conn: &mut PgConnection,
    event_id: &str,
    event_type: &str,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let rows = sqlx::query(
        "INSERT INTO processed_webhook_events (event_id, event_type, processed_at)
         VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
    )
    .bind(event_id)
    .bind(event_type)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .rows_affected();
    Ok(rows == 1)
}
