//! Audit log operations

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

/// Write an audit log entry
pub async fn log(
    conn: &mut PgConnection,
    action: &str,
    actor: Option<&str>,
    detail: Option<&serde_json::Value>,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO audit_log (action, actor, detail, created_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(action)
    .bind(actor)
    .bind(detail)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Query audit log entries (paginated)
#[derive(Debug, sqlx::FromRow, serde::Serialize)]
pub struct AuditEntry {
    pub id: i64,
    pub action: String,
    pub actor: Option<String>,
    pub detail: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

pub async fn query(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<AuditEntry>, sqlx::Error> {
    sqlx::query_as(
        "SELECT id, action, actor, detail, created_at
         FROM audit_log
         ORDER BY created_at DESC, id DESC
         LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}
