use rust_decimal::Decimal;
use shared::models::{
    Registration, RegistrationStatus, RegistrationStatusCount, RegistrationSummary,
};
use sqlx::{PgConnection, PgPool};

pub struct NewRegistration<'a> {
    pub id: i64,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub company: Option<&'a str>,
    pub is_ems_client: bool,
    pub ticket_type_id: i64,
    pub quantity: i32,
    pub attendee_names: &'a [String],
    pub coupon_id: Option<i64>,
    pub coupon_code: Option<&'a str>,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub status: RegistrationStatus,
    pub expires_at: Option<i64>,
    pub now: i64,
}

pub async fn insert_in_tx(
    conn: &mut PgConnection,
    r: &NewRegistration<'_>,
) -> Result<Registration, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO registrations
            (id, first_name, last_name, email, phone, company, is_ems_client, ticket_type_id,
             quantity, attendee_names, coupon_id, coupon_code, unit_price, subtotal, discount,
             total, status, expires_at, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $19)
         RETURNING *",
    )
    .bind(r.id)
    .bind(r.first_name)
    .bind(r.last_name)
    .bind(r.email)
    .bind(r.phone)
    .bind(r.company)
    .bind(r.is_ems_client)
    .bind(r.ticket_type_id)
    .bind(r.quantity)
    .bind(r.attendee_names)
    .bind(r.coupon_id)
    .bind(r.coupon_code)
    .bind(r.unit_price)
    .bind(r.subtotal)
    .bind(r.discount)
    .bind(r.total)
    .bind(r.status)
    .bind(r.expires_at)
    .bind(r.now)
    .fetch_one(&mut *conn)
    .await
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Registration>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM registrations WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Conditional status change. Returns `None` when the registration is not
/// currently in `from`, i.e. another request already moved it.
pub async fn transition_in_tx(
    conn: &mut PgConnection,
    id: i64,
    from: RegistrationStatus,
    to: RegistrationStatus,
    now: i64,
) -> Result<Option<Registration>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE registrations SET status = $3, updated_at = $4
         WHERE id = $1 AND status = $2
         RETURNING *",
    )
    .bind(id)
    .bind(from)
    .bind(to)
    .bind(now)
    .fetch_optional(&mut *conn)
    .await
}

/// Move the hold of a pending registration to the Checkout Session expiry.
/// Never shortens it.
pub async fn extend_hold(
    pool: &PgPool,
    id: i64,
    expires_at: i64,
    now: i64,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE registrations
         SET expires_at = GREATEST(COALESCE(expires_at, 0), $2), updated_at = $3
         WHERE id = $1 AND status = 'PENDING_PAYMENT'",
    )
    .bind(id)
    .bind(expires_at)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Pending registrations whose hold has run out
pub async fn find_expired_pending(
    pool: &PgPool,
    now: i64,
    limit: i64,
) -> Result<Vec<i64>, sqlx::Error> {
    let rows: Vec<(i64,)> = sqlx::query_as(
        "SELECT id FROM registrations
         WHERE status = 'PENDING_PAYMENT' AND expires_at IS NOT NULL AND expires_at < $1
         ORDER BY expires_at
         LIMIT $2",
    )
    .bind(now)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|r| r.0).collect())
}

#[derive(Debug, Default)]
pub struct RegistrationFilter {
    pub status: Option<RegistrationStatus>,
    /// Matched against name, email and company (case-insensitive) or the exact id
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl RegistrationFilter {
    fn pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")))
    }

    fn exact_id(&self) -> Option<i64> {
        self.search.as_deref().and_then(|s| s.trim().parse().ok())
    }
}

const FILTER_CLAUSE: &str = "($1::registration_status IS NULL OR r.status = $1)
    AND ($2::TEXT IS NULL
         OR r.email ILIKE $2 OR r.first_name ILIKE $2 OR r.last_name ILIKE $2
         OR r.company ILIKE $2 OR (r.first_name || ' ' || r.last_name) ILIKE $2
         OR r.id = $3)";

pub async fn list(
    pool: &PgPool,
    filter: &RegistrationFilter,
) -> Result<Vec<RegistrationSummary>, sqlx::Error> {
    let sql = format!(
        "SELECT r.id, r.first_name, r.last_name, r.email, r.company, r.is_ems_client,
                r.ticket_type_id, t.name AS ticket_type_name, r.quantity, r.coupon_code,
                r.total, r.status, r.created_at
         FROM registrations r
         JOIN ticket_types t ON t.id = r.ticket_type_id
         WHERE {FILTER_CLAUSE}
         ORDER BY r.created_at DESC
         LIMIT $4 OFFSET $5"
    );
    sqlx::query_as(&sql)
        .bind(filter.status)
        .bind(filter.pattern())
        .bind(filter.exact_id())
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(pool)
        .await
}

pub async fn count(pool: &PgPool, filter: &RegistrationFilter) -> Result<i64, sqlx::Error> {
    let sql = format!("SELECT COUNT(*) FROM registrations r WHERE {FILTER_CLAUSE}");
    let row: (i64,) = sqlx::query_as(&sql)
        .bind(filter.status)
        .bind(filter.pattern())
        .bind(filter.exact_id())
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}

pub async fn status_counts(pool: &PgPool) -> Result<Vec<RegistrationStatusCount>, sqlx::Error> {
    sqlx::query_as(
        "SELECT status, COUNT(*) AS count FROM registrations GROUP BY status ORDER BY status",
    )
    .fetch_all(pool)
    .await
}

/// Sum of totals over confirmed registrations
pub async fn confirmed_revenue(pool: &PgPool) -> Result<Decimal, sqlx::Error> {
    let row: (Decimal,) = sqlx::query_as(
        "SELECT COALESCE(SUM(total), 0) FROM registrations WHERE status = 'CONFIRMED'",
    )
    .fetch_one(pool)
    .await?;
    Ok(row.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_pattern_escapes_wildcards() {
        let filter = RegistrationFilter {
            search: Some(" 50%_off ".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.pattern().as_deref(), Some("%50\\%\\_off%"));
        assert_eq!(filter.exact_id(), None);
    }

    #[test]
    fn numeric_search_also_matches_id() {
        let filter = RegistrationFilter {
            search: Some("123456".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.exact_id(), Some(123456));
    }

    #[test]
    fn blank_search_is_no_filter() {
        let filter = RegistrationFilter {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(filter.pattern(), None);
    }
}
