//! Balance cache reads and upserts

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use shared::models::BalanceView;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

/// Current cached balance of `(account, asset)`; a missing row reads as zero
pub async fn read(
    conn: &mut PgConnection,
    account_id: Uuid,
    asset_type_id: Uuid,
) -> Result<Decimal, sqlx::Error> {
    let row: Option<(Decimal,)> = sqlx::query_as(
        "SELECT balance FROM balance_cache WHERE account_id = $1 AND asset_type_id = $2",
    )
    .bind(account_id)
    .bind(asset_type_id)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(row.map(|r| r.0).unwrap_or(Decimal::ZERO))
}

/// Write the new cached balance for `(account, asset)`
///
/// The `balance >= 0` check constraint backs up the writer's precondition at
/// the storage layer.
pub async fn upsert(
    conn: &mut PgConnection,
    account_id: Uuid,
    asset_type_id: Uuid,
    balance: Decimal,
    last_transaction_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO balance_cache (account_id, asset_type_id, balance, last_transaction_id, updated_at)
         VALUES ($1, $2, $3, $4, $5)
         ON CONFLICT (account_id, asset_type_id) DO UPDATE SET
            balance = EXCLUDED.balance,
            last_transaction_id = EXCLUDED.last_transaction_id,
            updated_at = EXCLUDED.updated_at",
    )
    .bind(account_id)
    .bind(asset_type_id)
    .bind(balance)
    .bind(last_transaction_id)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// One asset's balance for an account, zero when untouched
pub async fn view_for_asset(
    pool: &PgPool,
    account_id: Uuid,
    asset_code: &str,
) -> Result<Option<BalanceView>, sqlx::Error> {
    sqlx::query_as(
        "SELECT at.code AS asset_code, at.name AS asset_name,
                COALESCE(bc.balance, 0) AS balance
         FROM asset_types at
         LEFT JOIN balance_cache bc
                ON bc.asset_type_id = at.id AND bc.account_id = $1
         WHERE at.code = $2 AND at.is_active",
    )
    .bind(account_id)
    .bind(asset_code)
    .fetch_optional(pool)
    .await
}

/// Balances across all active assets for an account, zero-filled
pub async fn view_all(pool: &PgPool, account_id: Uuid) -> Result<Vec<BalanceView>, sqlx::Error> {
    sqlx::query_as(
        "SELECT at.code AS asset_code, at.name AS asset_name,
                COALESCE(bc.balance, 0) AS balance
         FROM asset_types at
         LEFT JOIN balance_cache bc
                ON bc.asset_type_id = at.id AND bc.account_id = $1
         WHERE at.is_active
         ORDER BY at.code",
    )
    .bind(account_id)
    .fetch_all(pool)
    .await
}
