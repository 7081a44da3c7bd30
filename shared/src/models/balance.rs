//! Balance and history views returned by the read-only surface

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ledger::{EntryType, TransactionStatus};

/// Cached balance of one asset in one user wallet
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct BalanceView {
    pub asset_code: String,
    pub asset_name: String,
    pub balance: Decimal,
}

/// One ledger entry joined with its parent transaction header
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct HistoryItem {
    pub entry_id: Uuid,
    pub transaction_id: Uuid,
    pub transaction_type: String,
    pub entry_type: EntryType,
    pub asset_code: String,
    pub amount: Decimal,
    pub running_balance: Decimal,
    pub description: Option<String>,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub transaction_created_at: DateTime<Utc>,
}
