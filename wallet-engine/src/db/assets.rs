//! Asset type lookups

use sqlx::PgPool;
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Asset {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub decimals: i32,
    pub is_active: bool,
}

/// Find an active asset by its short code
pub async fn find_active_by_code(pool: &PgPool, code: &str) -> Result<Option<Asset>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, code, name, decimals, is_active
         FROM asset_types
         WHERE code = $1 AND is_active",
    )
    .bind(code)
    .fetch_optional(pool)
    .await
}

/// All active assets, ordered by code
pub async fn list_active(pool: &PgPool) -> Result<Vec<Asset>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, code, name, decimals, is_active
         FROM asset_types
         WHERE is_active
         ORDER BY code",
    )
    .fetch_all(pool)
    .await
}
