//! Transaction headers, ledger entries, and the history query

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::models::{EntryType, HistoryItem};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

pub struct NewTransaction<'a> {
    pub id: Uuid,
    pub idempotency_key: &'a str,
    pub transaction_type_id: Uuid,
    pub asset_type_id: Uuid,
    pub amount: Decimal,
    pub description: &'a str,
    pub metadata: &'a serde_json::Value,
    pub created_at: DateTime<Utc>,
}

pub struct NewEntry<'a> {
    pub id: Uuid,
    pub transaction_id: Uuid,
    pub account_id: Uuid,
    pub asset_type_id: Uuid,
    pub entry_type: EntryType,
    pub amount: Decimal,
    pub running_balance: Decimal,
    pub description: &'a str,
    pub created_at: DateTime<Utc>,
}

/// Resolve a transaction-type code to its id
pub async fn transaction_type_id(
    conn: &mut PgConnection,
    code: &str,
) -> Result<Option<Uuid>, sqlx::Error> {
    let row: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM transaction_types WHERE code = $1")
        .bind(code)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.map(|r| r.0))
}

/// Insert a completed transaction header
///
/// A duplicate idempotency key surfaces as a unique violation here; the
/// orchestrator treats that as another worker having completed the movement.
pub async fn insert_transaction(
    conn: &mut PgConnection,
    tx: &NewTransaction<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO transactions
            (id, idempotency_key, transaction_type_id, asset_type_id, amount,
             description, metadata, status, created_at, completed_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, 'completed', $8, $8)",
    )
    .bind(tx.id)
    .bind(tx.idempotency_key)
    .bind(tx.transaction_type_id)
    .bind(tx.asset_type_id)
    .bind(tx.amount)
    .bind(tx.description)
    .bind(tx.metadata)
    .bind(tx.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Append one side of a movement
pub async fn insert_entry(conn: &mut PgConnection, entry: &NewEntry<'_>) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO ledger_entries
            (id, transaction_id, account_id, asset_type_id, entry_type,
             amount, running_balance, description, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(entry.id)
    .bind(entry.transaction_id)
    .bind(entry.account_id)
    .bind(entry.asset_type_id)
    .bind(entry.entry_type)
    .bind(entry.amount)
    .bind(entry.running_balance)
    .bind(entry.description)
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Ledger entries on an account joined with their parent headers, newest
/// transactions first
pub async fn history_for_account(
    pool: &PgPool,
    account_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<HistoryItem>, sqlx::Error> {
    sqlx::query_as(
        "SELECT le.id AS entry_id, t.id AS transaction_id, tt.code AS transaction_type,
                le.entry_type, at.code AS asset_code, le.amount, le.running_balance,
                le.description, t.status, le.created_at,
                t.created_at AS transaction_created_at
         FROM ledger_entries le
         JOIN transactions t ON t.id = le.transaction_id
         JOIN transaction_types tt ON tt.id = t.transaction_type_id
         JOIN asset_types at ON at.id = le.asset_type_id
         WHERE le.account_id = $1
         ORDER BY t.created_at DESC, t.id DESC, le.created_at DESC
         LIMIT $2 OFFSET $3",
    )
    .bind(account_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await
}
