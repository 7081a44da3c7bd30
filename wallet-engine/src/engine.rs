//! Movement orchestrator and read-only surface
//!
//! [`LedgerEngine`] exposes the five entry points: `top_up`, `issue_bonus`
//! and `purchase` on the write side, `get_balance`/`get_all_balances` and
//! `get_history` on the read side. Each write validates its inputs, takes
//! the idempotency fast path, resolves the accounts involved, and hands a
//! fully-resolved [`Movement`](crate::ledger::Movement) to the ledger writer
//! under the retry driver.

use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use rust_decimal::Decimal;
use serde_json::json;
use shared::models::{
    AccountKind, BalanceView, BonusRequest, HistoryItem, MovementReceipt, PurchaseRequest,
    TopUpRequest, TransactionKind,
};
use sqlx::PgPool;

use crate::config::Config;
use crate::db;
use crate::db::idempotency::IdempotencyRecord;
use crate::error::EngineError;
use crate::ledger::{self, Movement};
use crate::retry;
use crate::store;
use crate::util;

/// The transactional ledger engine
///
/// Cheap to clone-by-reference; holds only the pool handle and config. The
/// pool is injected so the engine can be driven against any database,
/// including test fixtures.
pub struct LedgerEngine {
    pool: PgPool,
    config: Config,
}

impl LedgerEngine {
    pub fn new(pool: PgPool, config: Config) -> Self {
        Self { pool, config }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ==================== Write surface ====================

    /// Credit a user wallet from the system treasury
    pub async fn top_up(&self, req: &TopUpRequest) -> Result<MovementReceipt, EngineError> {
        self.execute_movement(
            TransactionKind::TopUp,
            &req.user_id,
            &req.asset_code,
            req.amount,
            &req.idempotency_key,
            req.metadata.clone(),
        )
        .await
    }

    /// Credit a user wallet from the bonus pool
    pub async fn issue_bonus(&self, req: &BonusRequest) -> Result<MovementReceipt, EngineError> {
        self.execute_movement(
            TransactionKind::Bonus,
            &req.user_id,
            &req.asset_code,
            req.amount,
            &req.idempotency_key,
            req.metadata.clone(),
        )
        .await
    }

    /// Debit a user wallet into system revenue
    pub async fn purchase(&self, req: &PurchaseRequest) -> Result<MovementReceipt, EngineError> {
        self.execute_movement(
            TransactionKind::Purchase,
            &req.user_id,
            &req.asset_code,
            req.amount,
            &req.idempotency_key,
            req.metadata.clone(),
        )
        .await
    }

    async fn execute_movement(
        &self,
        kind: TransactionKind,
        user_id: &str,
        asset_code: &str,
        amount: Decimal,
        idempotency_key: &str,
        metadata: Option<serde_json::Value>,
    ) -> Result<MovementReceipt, EngineError> {
        validate_identifier(user_id, "userId")?;
        validate_identifier(asset_code, "assetCode")?;
        validate_identifier(idempotency_key, "idempotencyKey")?;
        if amount <= Decimal::ZERO {
            return Err(EngineError::Validation("amount must be positive".into()));
        }

        let request_hash = util::request_hash(user_id, asset_code, amount);

        // Fast path: a completed record under this key short-circuits the
        // whole movement, before any transaction is opened
        if let Some(hit) = db::idempotency::lookup(&self.pool, idempotency_key).await? {
            tracing::debug!(key = idempotency_key, "Idempotency fast-path hit");
            return replay(hit, &request_hash);
        }

        let asset = db::assets::find_active_by_code(&self.pool, asset_code)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("asset {asset_code}")))?;
        if amount.scale() > asset.decimals as u32 {
            return Err(EngineError::Validation(format!(
                "amount scale exceeds asset precision ({} decimals)",
                asset.decimals
            )));
        }

        let user_account = db::accounts::find_user_account(&self.pool, user_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("account for user {user_id}")))?;
        let counterparty_kind = match kind {
            TransactionKind::TopUp => AccountKind::SystemTreasury,
            TransactionKind::Bonus => AccountKind::SystemBonus,
            TransactionKind::Purchase => AccountKind::SystemRevenue,
        };
        let counterparty = db::accounts::find_system_account(&self.pool, counterparty_kind)
            .await?
            .ok_or_else(|| {
                EngineError::NotFound(format!("system account {}", counterparty_kind.code()))
            })?;

        // Purchases drain the wallet; the other two fill it
        let (source, destination) = match kind {
            TransactionKind::Purchase => (user_account.id, counterparty.id),
            _ => (counterparty.id, user_account.id),
        };

        let metadata = metadata.unwrap_or_else(|| json!({}));
        let description = metadata
            .get("description")
            .and_then(|v| v.as_str())
            .map(String::from)
            .unwrap_or_else(|| default_description(kind, amount, asset_code));
        let movement = Movement {
            kind,
            source_account: source,
            destination_account: destination,
            user_account: user_account.id,
            user_id: user_id.to_string(),
            asset_id: asset.id,
            asset_code: asset.code.clone(),
            amount,
            description,
            metadata,
            idempotency_key: idempotency_key.to_string(),
            request_hash: request_hash.clone(),
            idempotency_expires_at: Utc::now()
                + chrono::Duration::hours(self.config.idempotency_ttl_hours),
        };

        let pool = &self.pool;
        let result = retry::execute_with_retry(&self.config.retry, move || {
            let movement = movement.clone();
            async move {
                store::run_serializable(pool, move |conn| {
                    async move { ledger::append(conn, &movement).await }.boxed()
                })
                .await
            }
        })
        .await;

        match result {
            Ok(receipt) => {
                tracing::info!(
                    transaction_id = %receipt.transaction_id,
                    kind = kind.code(),
                    user_id,
                    asset = asset_code,
                    amount = %amount,
                    new_balance = %receipt.new_balance,
                    "Movement committed"
                );
                Ok(receipt)
            }
            // Another worker inserted this key first; its committed result
            // is the canonical outcome for this request
            Err(err) if err.is_unique_violation() => {
                tracing::debug!(key = idempotency_key, "Lost idempotency insert race");
                match db::idempotency::lookup(&self.pool, idempotency_key).await? {
                    Some(hit) => replay(hit, &request_hash),
                    None => Err(EngineError::Conflict(
                        "idempotency key already consumed".into(),
                    )),
                }
            }
            Err(err) => Err(err),
        }
    }

    // ==================== Read surface ====================

    /// Cached balance of one asset in the user's wallet; untouched assets
    /// read as zero
    pub async fn get_balance(
        &self,
        user_id: &str,
        asset_code: &str,
    ) -> Result<BalanceView, EngineError> {
        validate_identifier(user_id, "userId")?;
        validate_identifier(asset_code, "assetCode")?;
        let account = db::accounts::find_user_account(&self.pool, user_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("account for user {user_id}")))?;
        db::balances::view_for_asset(&self.pool, account.id, asset_code)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("asset {asset_code}")))
    }

    /// Balances across all active assets, zero-filled for untouched ones
    pub async fn get_all_balances(&self, user_id: &str) -> Result<Vec<BalanceView>, EngineError> {
        validate_identifier(user_id, "userId")?;
        let account = db::accounts::find_user_account(&self.pool, user_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("account for user {user_id}")))?;
        Ok(db::balances::view_all(&self.pool, account.id).await?)
    }

    /// Paginated ledger entries on the user's account, newest transactions
    /// first
    pub async fn get_history(
        &self,
        user_id: &str,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<HistoryItem>, EngineError> {
        validate_identifier(user_id, "userId")?;
        let limit = clamp_limit(
            limit,
            self.config.history_default_limit,
            self.config.history_max_limit,
        )?;
        let offset = offset.unwrap_or(0);
        if offset < 0 {
            return Err(EngineError::Validation("offset must not be negative".into()));
        }
        let account = db::accounts::find_user_account(&self.pool, user_id)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("account for user {user_id}")))?;
        Ok(db::ledger::history_for_account(&self.pool, account.id, limit, offset).await?)
    }

    /// Paginated audit trail, newest first
    pub async fn get_audit_trail(
        &self,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<db::audit::AuditEntry>, EngineError> {
        let limit = clamp_limit(
            limit,
            self.config.history_default_limit,
            self.config.history_max_limit,
        )?;
        let offset = offset.unwrap_or(0);
        if offset < 0 {
            return Err(EngineError::Validation("offset must not be negative".into()));
        }
        Ok(db::audit::query(&self.pool, limit, offset).await?)
    }

    // ==================== Lifecycle ====================

    /// Liveness probe against the store
    pub async fn health_check(&self) -> Result<(), EngineError> {
        Ok(store::health_check(&self.pool).await?)
    }

    /// Stop accepting work and drain the pool, bounded by the shutdown timer
    pub async fn shutdown(&self) {
        store::shutdown(
            &self.pool,
            Duration::from_millis(self.config.shutdown_timeout_ms),
        )
        .await;
    }
}

/// Return the stored receipt for a replayed key, enforcing payload equality
fn replay(hit: IdempotencyRecord, request_hash: &str) -> Result<MovementReceipt, EngineError> {
    if hit.request_hash != request_hash {
        return Err(EngineError::Conflict(
            "idempotency key reused with a different payload".into(),
        ));
    }
    serde_json::from_value(hit.response)
        .map_err(|e| EngineError::Internal(format!("stored idempotency response corrupt: {e}")))
}

fn validate_identifier(value: &str, field: &str) -> Result<(), EngineError> {
    if value.trim().is_empty() {
        return Err(EngineError::Validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn clamp_limit(limit: Option<i64>, default: i64, max: i64) -> Result<i64, EngineError> {
    match limit {
        None => Ok(default),
        Some(l) if l < 0 => Err(EngineError::Validation("limit must not be negative".into())),
        Some(0) => Ok(default),
        Some(l) => Ok(l.min(max)),
    }
}

fn default_description(kind: TransactionKind, amount: Decimal, asset_code: &str) -> String {
    match kind {
        TransactionKind::TopUp => format!("Top-up of {amount} {asset_code}"),
        TransactionKind::Bonus => format!("Bonus of {amount} {asset_code}"),
        TransactionKind::Purchase => format!("Purchase of {amount} {asset_code}"),
    }
}
