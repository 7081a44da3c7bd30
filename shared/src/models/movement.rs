//! Movement request payloads and the receipt returned for each movement

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Credit a user wallet from the system treasury
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopUpRequest {
    pub user_id: String,
    pub asset_code: String,
    pub amount: Decimal,
    pub idempotency_key: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Credit a user wallet from the bonus pool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BonusRequest {
    pub user_id: String,
    pub asset_code: String,
    pub amount: Decimal,
    pub idempotency_key: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Debit a user wallet into system revenue
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub user_id: String,
    pub asset_code: String,
    pub amount: Decimal,
    pub idempotency_key: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Receipt for a committed (or replayed) movement
///
/// This is the exact payload stored in the idempotency log, so replays
/// return it byte-for-byte.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementReceipt {
    pub transaction_id: Uuid,
    pub user_id: String,
    pub asset_code: String,
    pub amount: Decimal,
    /// User-side balance after the movement
    pub new_balance: Decimal,
    /// Bonus movements only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Purchase movements only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<String>,
    pub timestamp: DateTime<Utc>,
}
