//! Account lookups and row-level locking

use shared::models::AccountKind;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    pub account_type: String,
    pub user_id: Option<String>,
    pub name: String,
    pub is_active: bool,
}

/// Find a user's active wallet account
pub async fn find_user_account(
    pool: &PgPool,
    user_id: &str,
) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as(
        "SELECT a.id, at.code AS account_type, a.user_id, a.name, a.is_active
         FROM accounts a
         JOIN account_types at ON at.id = a.account_type_id
         WHERE a.user_id = $1 AND at.code = 'USER' AND a.is_active",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Find the active system account of the given kind
pub async fn find_system_account(
    pool: &PgPool,
    kind: AccountKind,
) -> Result<Option<Account>, sqlx::Error> {
    sqlx::query_as(
        "SELECT a.id, at.code AS account_type, a.user_id, a.name, a.is_active
         FROM accounts a
         JOIN account_types at ON at.id = a.account_type_id
         WHERE at.code = $1 AND a.is_active
         ORDER BY a.created_at
         LIMIT 1",
    )
    .bind(kind.code())
    .fetch_optional(pool)
    .await
}

/// Acquire row locks on a pair of accounts in ascending id order
///
/// Ascending order rules out circular waits between concurrent movements
/// touching the same two accounts in opposite roles; NOWAIT turns any
/// residual contention into an immediately retriable failure (SQLSTATE
/// 55P03) instead of a blocked connection.
pub async fn lock_pair(conn: &mut PgConnection, a: Uuid, b: Uuid) -> Result<(), sqlx::Error> {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    lock_one(conn, first).await?;
    if second != first {
        lock_one(conn, second).await?;
    }
    Ok(())
}

async fn lock_one(conn: &mut PgConnection, id: Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT id FROM accounts WHERE id = $1 FOR UPDATE NOWAIT")
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(())
}
