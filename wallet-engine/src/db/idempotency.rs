//! Idempotency log operations

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct IdempotencyRecord {
    pub request_hash: String,
    pub response: serde_json::Value,
}

/// Look up a completed, unexpired record for the key
///
/// Runs outside any transaction; expired rows read as absent.
pub async fn lookup(pool: &PgPool, key: &str) -> Result<Option<IdempotencyRecord>, sqlx::Error> {
    sqlx::query_as(
        "SELECT request_hash, response
         FROM idempotency_log
         WHERE idempotency_key = $1
           AND status = 'completed'
           AND expires_at > now()",
    )
    .bind(key)
    .fetch_optional(pool)
    .await
}

/// Record the movement's response, inside the same transaction that wrote
/// the ledger
///
/// An expired row under the same key is replaced in place. A live row cannot
/// exist at this point: a competing worker that committed first would have
/// made the header insert fail before this statement runs.
pub async fn record(
    conn: &mut PgConnection,
    key: &str,
    request_hash: &str,
    response: &serde_json::Value,
    now: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO idempotency_log
            (idempotency_key, request_hash, response, status, created_at, expires_at)
         VALUES ($1, $2, $3, 'completed', $4, $5)
         ON CONFLICT (idempotency_key) DO UPDATE SET
            request_hash = EXCLUDED.request_hash,
            response = EXCLUDED.response,
            status = EXCLUDED.status,
            created_at = EXCLUDED.created_at,
            expires_at = EXCLUDED.expires_at",
    )
    .bind(key)
    .bind(request_hash)
    .bind(response)
    .bind(now)
    .bind(expires_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}
