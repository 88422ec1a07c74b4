use shared::models::{AdminRole, AdminUser};
use sqlx::PgPool;

pub async fn list(pool: &PgPool) -> Result<Vec<AdminUser>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM admin_users ORDER BY created_at")
        .fetch_all(pool)
        .await
}

pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<AdminUser>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM admin_users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_by_username(
    pool: &PgPool,
    username: &str,
) -> Result<Option<AdminUser>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM admin_users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await
}

pub async fn create(
    pool: &PgPool,
    id: i64,
    username: &str,
    email: Option<&str>,
    hashed_password: &str,
    role: AdminRole,
    now: i64,
) -> Result<AdminUser, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO admin_users (id, username, email, hashed_password, role, is_active, created_at)
         VALUES ($1, $2, $3, $4, $5, TRUE, $6)
         RETURNING *",
    )
    .bind(id)
    .bind(username)
    .bind(email)
    .bind(hashed_password)
    .bind(role)
    .bind(now)
    .fetch_one(pool)
    .await
}

pub async fn update(
    pool: &PgPool,
    id: i64,
    email: Option<&str>,
    hashed_password: Option<&str>,
    role: Option<AdminRole>,
    is_active: Option<bool>,
) -> Result<Option<AdminUser>, sqlx::Error> {
    sqlx::query_as(
        "UPDATE admin_users SET
            email = COALESCE($2, email),
            hashed_password = COALESCE($3, hashed_password),
            role = COALESCE($4, role),
            is_active = COALESCE($5, is_active)
         WHERE id = $1
         RETURNING *",
    )
    .bind(id)
    .bind(email)
    .bind(hashed_password)
    .bind(role)
    .bind(is_active)
    .fetch_optional(pool)
    .await
}

pub async fn touch_last_login(pool: &PgPool, id: i64, now: i64) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE admin_users SET last_login_at = $2 WHERE id = $1")
        .bind(id)
        .bind(now)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn count_active_admins(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM admin_users WHERE role = 'ADMIN' AND is_active")
            .fetch_one(pool)
            .await?;
    Ok(row.0)
}
