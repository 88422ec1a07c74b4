use shared::models::{StockCorrection, TicketType, TicketTypeCreate, TicketTypeUpdate};
use sqlx::{PgConnection, PgPool};

pub async fn list_all(pool: &PgPool) -> Result<Vec<TicketType>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM ticket_types ORDER BY sort_order, id")
        .fetch_all(pool)
        .await
}

pub async fn list_active(pool: &PgPool) -> Result<Vec<TicketType>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM ticket_types WHERE is_active ORDER BY sort_order, id")
        .fetch_all(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<TicketType>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM ticket_types WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_id_in_tx(
    conn: &mut PgConnection,
    id: i64,
) -> Result<Option<TicketType>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM ticket_types WHERE id = $1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn create(
    pool: &PgPool,
    id: i64,
    data: &TicketTypeCreate,
    now: i64,
) -> Result<TicketType, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO ticket_types
            (id, name, description, price, total_stock, max_per_order, sort_order, is_active, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
         RETURNING *",
    )
    .bind(id)
    .bind(data.name.trim())
    .bind(&data.description)
    .bind(data.price)
    .bind(data.total_stock)
    .bind(data.max_per_order.unwrap_or(10))
    .bind(data.sort_order.unwrap_or(0))
    .bind(data.is_active.unwrap_or(true))
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Partial update. `total_stock` is only applied when it stays at or above
/// `reserved_stock + sold_stock`; otherwise no row is returned.
pub async fn update(
    pool: &PgPool,
    id: i64,
    data: &TicketTypeUpdate,
    now: i64,
) -> Result<Option<TicketType>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE ticket_types SET
            name = COALESCE($2, name),
            description = COALESCE($3, description),
            price = COALESCE($4, price),
            total_stock = COALESCE($5, total_stock),
            max_per_order = COALESCE($6, max_per_order),
            sort_order = COALESCE($7, sort_order),
            is_active = COALESCE($8, is_active),
            updated_at = $9
         WHERE id = $1
           AND ($5::INTEGER IS NULL OR $5 >= reserved_stock + sold_stock)
         RETURNING *",
    )
    .bind(id)
    .bind(data.name.as_deref().map(str::trim))
    .bind(&data.description)
    .bind(data.price)
    .bind(data.total_stock)
    .bind(data.max_per_order)
    .bind(data.sort_order)
    .bind(data.is_active)
    .bind(now)
    .fetch_optional(pool)
    .await
}

/// Hold `quantity` units for a pending registration.
///
/// Returns `false` when the type is inactive or fewer than `quantity` units
/// are available.
pub async fn reserve_in_tx(
    conn: &mut PgConnection,
    id: i64,
    quantity: i32,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let rows = sqlx::query(
        "UPDATE ticket_types
         SET reserved_stock = reserved_stock + $2, updated_at = $3
         WHERE id = $1 AND is_active
           AND total_stock - reserved_stock - sold_stock >= $2",
    )
    .bind(id)
    .bind(quantity)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .rows_affected();
    Ok(rows == 1)
}

/// Give held units back to the pool
pub async fn release_reserved_in_tx(
    conn: &mut PgConnection,
    id: i64,
    quantity: i32,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let rows = sqlx::query(
        "UPDATE ticket_types
         SET reserved_stock = reserved_stock - $2, updated_at = $3
         WHERE id = $1 AND reserved_stock >= $2",
    )
    .bind(id)
    .bind(quantity)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .rows_affected();
    Ok(rows == 1)
}

/// Move held units to sold once a registration is confirmed
pub async fn commit_reserved_in_tx(
    conn: &mut PgConnection,
    id: i64,
    quantity: i32,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let rows = sqlx::query(
        "UPDATE ticket_types
         SET reserved_stock = reserved_stock - $2, sold_stock = sold_stock + $2, updated_at = $3
         WHERE id = $1 AND reserved_stock >= $2",
    )
    .bind(id)
    .bind(quantity)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .rows_affected();
    Ok(rows == 1)
}

/// Return sold units (cancelled tickets) to sale
pub async fn return_sold_in_tx(
    conn: &mut PgConnection,
    id: i64,
    quantity: i32,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let rows = sqlx::query(
        "UPDATE ticket_types
         SET sold_stock = sold_stock - $2, updated_at = $3
         WHERE id = $1 AND sold_stock >= $2",
    )
    .bind(id)
    .bind(quantity)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .rows_affected();
    Ok(rows == 1)
}

/// Recompute `reserved_stock` from pending registrations and `sold_stock`
/// from live tickets. Returns only the rows that changed.
///
/// Ticket type rows are locked first so in-flight reservations finish before
/// the counts are taken.
pub async fn reconcile(pool: &PgPool, now: i64) -> Result<Vec<StockCorrection>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT id FROM ticket_types FOR UPDATE")
        .execute(&mut *tx)
        .await?;

    let corrections: Vec<StockCorrection> = sqlx::query_as(
        "WITH actual AS (
            SELECT t.id, t.name,
                   t.reserved_stock AS reserved_before,
                   t.sold_stock AS sold_before,
                   COALESCE(p.qty, 0)::INTEGER AS reserved_after,
                   COALESCE(s.cnt, 0)::INTEGER AS sold_after
            FROM ticket_types t
            LEFT JOIN (
                SELECT ticket_type_id, SUM(quantity) AS qty
                FROM registrations
                WHERE status = 'PENDING_PAYMENT'
                GROUP BY ticket_type_id
            ) p ON p.ticket_type_id = t.id
            LEFT JOIN (
                SELECT ticket_type_id, COUNT(*) AS cnt
                FROM tickets
                WHERE status <> 'CANCELLED'
                GROUP BY ticket_type_id
            ) s ON s.ticket_type_id = t.id
         )
         UPDATE ticket_types tt
         SET reserved_stock = a.reserved_after, sold_stock = a.sold_after, updated_at = $1
         FROM actual a
         WHERE tt.id = a.id
           AND (tt.reserved_stock <> a.reserved_after OR tt.sold_stock <> a.sold_after)
         RETURNING a.id AS ticket_type_id, a.name, a.reserved_before, a.reserved_after,
                   a.sold_before, a.sold_after",
    )
    .bind(now)
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(corrections)
}
