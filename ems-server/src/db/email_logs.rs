use shared::models::{EmailKind, EmailLog, EmailStatus};
use sqlx::PgPool;

#[allow(clippy::too_many_arguments)]
pub async fn insert(
    pool: &PgPool,
    id: i64,
    recipient: &str,
    subject: &str,
    kind: EmailKind,
    registration_id: Option<i64>,
    status: EmailStatus,
    error: Option<&str>,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO email_logs (id, recipient, subject, kind, registration_id, status, error, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(id)
    .bind(recipient)
    .bind(subject)
    .bind(kind)
    .bind(registration_id)
    .bind(status)
    .bind(error)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<EmailLog>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM email_logs ORDER BY created_at DESC LIMIT $1 OFFSET $2")
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
}
