use shared::models::{Ticket, TicketCounts, TicketDetail, TicketStatus};
use sqlx::{PgConnection, PgPool};

const DETAIL_SELECT: &str = "SELECT k.id, k.registration_id, k.ticket_type_id, t.name AS ticket_type_name,
        k.ticket_number, k.attendee_name, r.email, r.company, k.status,
        k.checked_in_at, k.checked_in_by, k.created_at
    FROM tickets k
    JOIN registrations r ON r.id = k.registration_id
    JOIN ticket_types t ON t.id = k.ticket_type_id";

/// Insert a ticket unless its number (or id) is already taken.
///
/// A collision returns `None` without aborting the surrounding
/// transaction, so the caller can retry with a fresh number and id.
pub async fn insert_in_tx(
    conn: &mut PgConnection,
    id: i64,
    registration_id: i64,
    ticket_type_id: i64,
    ticket_number: &str,
    attendee_name: &str,
    now: i64,
) -> Result<Option<Ticket>, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO tickets (id, registration_id, ticket_type_id, ticket_number, attendee_name, status, created_at)
         VALUES ($1, $2, $3, $4, $5, 'ISSUED', $6)
         ON CONFLICT DO NOTHING
         RETURNING *",
    )
    .bind(id)
    .bind(registration_id)
    .bind(ticket_type_id)
    .bind(ticket_number)
    .bind(attendee_name)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await
}

pub async fn list_by_registration(
    pool: &PgPool,
    registration_id: i64,
) -> Result<Vec<Ticket>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM tickets WHERE registration_id = $1 ORDER BY created_at, id")
        .bind(registration_id)
        .fetch_all(pool)
        .await
}

pub async fn find_detail(
    pool: &PgPool,
    ticket_number: &str,
) -> Result<Option<TicketDetail>, sqlx::Error> {
    sqlx::query_as(&format!("{DETAIL_SELECT} WHERE k.ticket_number = $1"))
        .bind(ticket_number)
        .fetch_optional(pool)
        .await
}

/// `ISSUED -> CHECKED_IN`. At most one caller gets `Some` for a ticket.
pub async fn check_in(
    pool: &PgPool,
    ticket_number: &str,
    checked_in_by: &str,
    now: i64,
) -> Result<Option<Ticket>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE tickets SET status = 'CHECKED_IN', checked_in_at = $2, checked_in_by = $3
         WHERE ticket_number = $1 AND status = 'ISSUED'
         RETURNING *",
    )
    .bind(ticket_number)
    .bind(now)
    .bind(checked_in_by)
    .fetch_optional(pool)
    .await
}

/// Cancel every still-unused ticket of a registration. Checked-in tickets
/// are left as they are.
pub async fn cancel_issued_in_tx(
    conn: &mut PgConnection,
    registration_id: i64,
) -> Result<Vec<Ticket>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE tickets SET status = 'CANCELLED'
         WHERE registration_id = $1 AND status = 'ISSUED'
         RETURNING *",
    )
    .bind(registration_id)
    .fetch_all(&mut *conn)
    .await
}

pub async fn list(
    pool: &PgPool,
    status: Option<TicketStatus>,
    limit: i64,
    offset: i64,
) -> Result<Vec<TicketDetail>, sqlx::Error> {
    sqlx::query_as(&format!(
        "{DETAIL_SELECT}
         WHERE ($1::ticket_status IS NULL OR k.status = $1)
         ORDER BY k.created_at DESC, k.id
         LIMIT $2 OFFSET $3"
    ))
    .bind(status)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}

pub async fn counts(pool: &PgPool) -> Result<TicketCounts, sqlx::Error> {
    sqlx::query_as(
        "SELECT COUNT(*) FILTER (WHERE status = 'ISSUED') AS issued,
                COUNT(*) FILTER (WHERE status = 'CHECKED_IN') AS checked_in,
                COUNT(*) FILTER (WHERE status = 'CANCELLED') AS cancelled
         FROM tickets",
    )
    .fetch_one(pool)
    .await
}
