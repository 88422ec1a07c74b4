use shared::models::PanelInterest;
use sqlx::PgPool;

pub struct NewPanelInterest<'a> {
    pub id: i64,
    pub name: &'a str,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub company: Option<&'a str>,
    pub topic: Option<&'a str>,
    pub message: Option<&'a str>,
    pub now: i64,
}

pub async fn insert(pool: &PgPool, p: &NewPanelInterest<'_>) -> Result<PanelInterest, sqlx::Error> {
    sqlx::query_as(
        "INSERT INTO panel_interests (id, name, email, phone, company, topic, message, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING *",
    )
    .bind(p.id)
    .bind(p.name)
    .bind(p.email)
    .bind(p.phone)
    .bind(p.company)
    .bind(p.topic)
    .bind(p.message)
    .bind(p.now)
    .fetch_one(pool)
    .await
}

pub async fn list(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<PanelInterest>, sqlx::Error> {
    sqlx::query_as("SELECT * FROM panel_interests ORDER BY created_at DESC LIMIT $1 OFFSET $2")
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
}

pub async fn count(pool: &PgPool) -> Result<i64, sqlx::Error> {
    let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM panel_interests")
        .fetch_one(pool)
        .await?;
    Ok(row.0)
}
