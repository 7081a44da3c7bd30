//! Double-entry ledger writer
//!
//! [`append`] is the single write primitive: one fully-resolved movement
//! becomes one transaction header, exactly two ledger entries (equal-amount
//! debit and credit), balance-cache updates for both accounts, an audit
//! record, and the idempotency record, all inside the caller-supplied
//! serializable transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use shared::models::{EntryType, MovementReceipt, TransactionKind};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::db;
use crate::error::EngineError;

/// A fully-resolved movement, ready to persist
#[derive(Debug, Clone)]
pub struct Movement {
    pub kind: TransactionKind,
    pub source_account: Uuid,
    pub destination_account: Uuid,
    /// Which of the two accounts is the user's wallet; its post-movement
    /// balance goes on the receipt
    pub user_account: Uuid,
    pub user_id: String,
    pub asset_id: Uuid,
    pub asset_code: String,
    pub amount: Decimal,
    pub description: String,
    pub metadata: serde_json::Value,
    pub idempotency_key: String,
    pub request_hash: String,
    pub idempotency_expires_at: DateTime<Utc>,
}

impl Movement {
    /// Audit-log action tag for this movement kind
    fn action(&self) -> &'static str {
        match self.kind {
            TransactionKind::TopUp => "wallet.top_up",
            TransactionKind::Bonus => "wallet.bonus",
            TransactionKind::Purchase => "wallet.purchase",
        }
    }

    /// Assemble the receipt that is both returned and stored for replays
    fn receipt(
        &self,
        transaction_id: Uuid,
        new_balance: Decimal,
        timestamp: DateTime<Utc>,
    ) -> MovementReceipt {
        let reason = match self.kind {
            TransactionKind::Bonus => self
                .metadata
                .get("reason")
                .and_then(|v| v.as_str())
                .map(String::from),
            _ => None,
        };
        let item = match self.kind {
            TransactionKind::Purchase => self
                .metadata
                .get("itemName")
                .or_else(|| self.metadata.get("item"))
                .and_then(|v| v.as_str())
                .map(String::from),
            _ => None,
        };
        MovementReceipt {
            transaction_id,
            user_id: self.user_id.clone(),
            asset_code: self.asset_code.clone(),
            amount: self.amount,
            new_balance,
            reason,
            item,
            timestamp,
        }
    }
}

/// Persist one movement
///
/// Must run inside a serializable transaction; every failure exit leaves the
/// transaction poisoned for the caller to roll back. A duplicate idempotency
/// key propagates as a unique violation for the orchestrator's re-lookup.
pub async fn append(
    conn: &mut PgConnection,
    movement: &Movement,
) -> Result<MovementReceipt, EngineError> {
    let now = Utc::now();

    // 1. Lock both accounts in ascending id order, NOWAIT
    db::accounts::lock_pair(conn, movement.source_account, movement.destination_account).await?;

    // 2. Current cached balances; missing rows read as zero
    let source_balance =
        db::balances::read(conn, movement.source_account, movement.asset_id).await?;
    let destination_balance =
        db::balances::read(conn, movement.destination_account, movement.asset_id).await?;

    // 3. The source must cover the movement, whichever pool or wallet it is
    if source_balance < movement.amount {
        return Err(EngineError::InsufficientFunds {
            requested: movement.amount,
            available: source_balance,
        });
    }
    let new_source_balance = source_balance - movement.amount;
    let new_destination_balance = destination_balance + movement.amount;

    // 4. Transaction header, committed as 'completed'
    let transaction_type_id = db::ledger::transaction_type_id(conn, movement.kind.code())
        .await?
        .ok_or_else(|| {
            EngineError::NotFound(format!("transaction type {}", movement.kind.code()))
        })?;
    let transaction_id = Uuid::new_v4();
    db::ledger::insert_transaction(
        conn,
        &db::ledger::NewTransaction {
            id: transaction_id,
            idempotency_key: &movement.idempotency_key,
            transaction_type_id,
            asset_type_id: movement.asset_id,
            amount: movement.amount,
            description: &movement.description,
            metadata: &movement.metadata,
            created_at: now,
        },
    )
    .await?;

    // 5. One debit on the source, one credit on the destination
    db::ledger::insert_entry(
        conn,
        &db::ledger::NewEntry {
            id: Uuid::new_v4(),
            transaction_id,
            account_id: movement.source_account,
            asset_type_id: movement.asset_id,
            entry_type: EntryType::Debit,
            amount: movement.amount,
            running_balance: new_source_balance,
            description: &movement.description,
            created_at: now,
        },
    )
    .await?;
    db::ledger::insert_entry(
        conn,
        &db::ledger::NewEntry {
            id: Uuid::new_v4(),
            transaction_id,
            account_id: movement.destination_account,
            asset_type_id: movement.asset_id,
            entry_type: EntryType::Credit,
            amount: movement.amount,
            running_balance: new_destination_balance,
            description: &movement.description,
            created_at: now,
        },
    )
    .await?;

    // 6. Balance cache for both sides
    db::balances::upsert(
        conn,
        movement.source_account,
        movement.asset_id,
        new_source_balance,
        transaction_id,
        now,
    )
    .await?;
    db::balances::upsert(
        conn,
        movement.destination_account,
        movement.asset_id,
        new_destination_balance,
        transaction_id,
        now,
    )
    .await?;

    // 7. Audit trail
    let detail = json!({
        "userId": movement.user_id,
        "assetCode": movement.asset_code,
        "amount": movement.amount,
        "idempotencyKey": movement.idempotency_key,
        "transactionId": transaction_id,
    });
    db::audit::log(
        conn,
        movement.action(),
        Some(&movement.user_id),
        Some(&detail),
        now,
    )
    .await?;

    // 8. Idempotency record, same transaction as everything above
    let new_balance = if movement.user_account == movement.destination_account {
        new_destination_balance
    } else {
        new_source_balance
    };
    let receipt = movement.receipt(transaction_id, new_balance, now);
    let response = serde_json::to_value(&receipt)
        .map_err(|e| EngineError::Internal(format!("receipt serialization failed: {e}")))?;
    db::idempotency::record(
        conn,
        &movement.idempotency_key,
        &movement.request_hash,
        &response,
        now,
        movement.idempotency_expires_at,
    )
    .await?;

    tracing::debug!(
        transaction_id = %transaction_id,
        kind = movement.kind.code(),
        user_id = %movement.user_id,
        asset = %movement.asset_code,
        amount = %movement.amount,
        "Movement persisted"
    );

    Ok(receipt)
}
