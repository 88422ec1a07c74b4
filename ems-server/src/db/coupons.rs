use shared::models::{
    Coupon, CouponCreate, CouponRedemption, CouponUpdate, CouponUsage, CouponUsageFix,
};
use sqlx::{PgConnection, PgPool};

pub async fn list(pool: &PgPool) -> Result<Vec<Coupon>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM coupons ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Coupon>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM coupons WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// `code` must already be normalized
pub async fn find_by_code(pool: &PgPool, code: &str) -> Result<Option<Coupon>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM coupons WHERE code = $1")
        .bind(code)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_code_in_tx(
    conn: &mut PgConnection,
    code: &str,
) -> Result<Option<Coupon>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM coupons WHERE code = $1")
        .bind(code)
        .fetch_optional(&mut *conn)
        .await
}

pub async fn create(
    pool: &PgPool,
    id: i64,
    code: &str,
    data: &CouponCreate,
    now: i64,
) -> Result<Coupon, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO coupons
            (id, code, description, discount_type, discount_value, max_uses, min_quantity,
             ticket_type_id, valid_from, valid_until, is_active, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12)
         RETURNING *",
    )
    .bind(id)
    .bind(code)
    .bind(&data.description)
    .bind(data.discount_type)
    .bind(data.discount_value)
    .bind(data.max_uses)
    .bind(data.min_quantity)
    .bind(data.ticket_type_id)
    .bind(data.valid_from)
    .bind(data.valid_until)
    .bind(data.is_active.unwrap_or(true))
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Partial update. Nullable columns use a "set" flag so `null` can clear them.
///
/// A new `max_uses` below the current `used_count` matches no row.
pub async fn update(
    pool: &PgPool,
    id: i64,
    data: &CouponUpdate,
    now: i64,
) -> Result<Option<Coupon>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE coupons SET
            description = COALESCE($2, description),
            discount_type = COALESCE($3, discount_type),
            discount_value = COALESCE($4, discount_value),
            max_uses = CASE WHEN $5 THEN $6 ELSE max_uses END,
            min_quantity = CASE WHEN $7 THEN $8 ELSE min_quantity END,
            ticket_type_id = CASE WHEN $9 THEN $10 ELSE ticket_type_id END,
            valid_from = CASE WHEN $11 THEN $12 ELSE valid_from END,
            valid_until = CASE WHEN $13 THEN $14 ELSE valid_until END,
            is_active = COALESCE($15, is_active),
            updated_at = $16
         WHERE id = $1
           AND (NOT $5 OR $6::INTEGER IS NULL OR $6 >= used_count)
         RETURNING *",
    )
    .bind(id)
    .bind(&data.description)
    .bind(data.discount_type)
    .bind(data.discount_value)
    .bind(data.max_uses.is_some())
    .bind(data.max_uses.flatten())
    .bind(data.min_quantity.is_some())
    .bind(data.min_quantity.flatten())
    .bind(data.ticket_type_id.is_some())
    .bind(data.ticket_type_id.flatten())
    .bind(data.valid_from.is_some())
    .bind(data.valid_from.flatten())
    .bind(data.valid_until.is_some())
    .bind(data.valid_until.flatten())
    .bind(data.is_active)
    .bind(now)
    .fetch_optional(pool)
    .await
}

pub async fn deactivate(pool: &PgPool, id: i64, now: i64) -> Result<bool, sqlx::Error> {
    let rows = sqlx::query("UPDATE coupons SET is_active = FALSE, updated_at = $2 WHERE id = $1")
        .bind(id)
        .bind(now)
        .execute(pool)
        .await?
        .rows_affected();
    Ok(rows == 1)
}

/// Take one use of a coupon. Returns `false` when the coupon is inactive or
/// its usage limit is already reached.
pub async fn claim_in_tx(conn: &mut PgConnection, id: i64, now: i64) -> Result<bool, sqlx::Error> {
    let rows = sqlx::query(
        "UPDATE coupons
         SET used_count = used_count + 1, updated_at = $2
         WHERE id = $1 AND is_active
           AND (max_uses IS NULL OR used_count < max_uses)",
    )
    .bind(id)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .rows_affected();
    Ok(rows == 1)
}

/// Give one use back
pub async fn unclaim_in_tx(
    conn: &mut PgConnection,
    id: i64,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let rows = sqlx::query(
        "UPDATE coupons
         SET used_count = used_count - 1, updated_at = $2
         WHERE id = $1 AND used_count > 0",
    )
    .bind(id)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .rows_affected();
    Ok(rows == 1)
}

pub async fn insert_redemption_in_tx(
    conn: &mut PgConnection,
    id: i64,
    coupon_id: i64,
    registration_id: i64,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO coupon_redemptions (id, coupon_id, registration_id, status, created_at, updated_at)
         VALUES ($1, $2, $3, 'RESERVED', $4, $4)",
    )
    .bind(id)
    .bind(coupon_id)
    .bind(registration_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// `RESERVED -> CONFIRMED`
pub async fn confirm_redemption_in_tx(
    conn: &mut PgConnection,
    registration_id: i64,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let rows = sqlx::query(
        "UPDATE coupon_redemptions SET status = 'CONFIRMED', updated_at = $2
         WHERE registration_id = $1 AND status = 'RESERVED'",
    )
    .bind(registration_id)
    .bind(now)
    .execute(&mut *conn)
    .await?
    .rows_affected();
    Ok(rows == 1)
}

/// `RESERVED | CONFIRMED -> RELEASED`. Returns the coupon id when a live
/// redemption was released; the caller then gives the use back.
pub async fn release_redemption_in_tx(
    conn: &mut PgConnection,
    registration_id: i64,
    now: i64,
) -> Result<Option<i64>, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as(
        "UPDATE coupon_redemptions SET status = 'RELEASED', updated_at = $2
         WHERE registration_id = $1 AND status <> 'RELEASED'
         RETURNING coupon_id",
    )
    .bind(registration_id)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.map(|r| r.0))
}

pub async fn find_redemption(
    pool: &PgPool,
    registration_id: i64,
) -> Result<Option<CouponRedemption>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM coupon_redemptions WHERE registration_id = $1")
        .bind(registration_id)
        .fetch_optional(pool)
        .await
}

/// Recompute `used_count` from live (`RESERVED`/`CONFIRMED`) redemptions.
/// Returns only the coupons that changed.
pub async fn fix_usage(pool: &PgPool, now: i64) -> Result<Vec<CouponUsageFix>, sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query("SELECT id FROM coupons FOR UPDATE")
        .execute(&mut *tx)
        .await?;

    let fixes: Vec<CouponUsageFix> = sqlx::query_as(
        "WITH actual AS (
            SELECT c.id, c.code, c.used_count AS before, COALESCE(r.cnt, 0)::INTEGER AS after
            FROM coupons c
            LEFT JOIN (
                SELECT coupon_id, COUNT(*) AS cnt
                FROM coupon_redemptions
                WHERE status IN ('RESERVED', 'CONFIRMED')
                GROUP BY coupon_id
            ) r ON r.coupon_id = c.id
         )
         UPDATE coupons c
         SET used_count = a.after, updated_at = $1
         FROM actual a
         WHERE c.id = a.id AND c.used_count <> a.after
         RETURNING a.id AS coupon_id, a.code, a.before, a.after",
    )
    .bind(now)
    .fetch_all(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(fixes)
}

/// Most-used coupons with their confirmed redemption count
pub async fn usage_top(pool: &PgPool, limit: i64) -> Result<Vec<CouponUsage>, sqlx::Error> {
    sqlx::query_as(
        "SELECT c.id AS coupon_id, c.code, c.used_count, c.max_uses,
                COUNT(r.id) FILTER (WHERE r.status = 'CONFIRMED') AS confirmed
         FROM coupons c
         LEFT JOIN coupon_redemptions r ON r.coupon_id = c.id
         GROUP BY c.id
         ORDER BY c.used_count DESC, c.code
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}
