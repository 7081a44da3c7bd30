//! Ledger vocabulary: entry sides, movement kinds, statuses, account kinds

use serde::{Deserialize, Serialize};

/// Side of a double-entry ledger movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
pub enum EntryType {
    Debit,
    Credit,
}

/// Business movement kind, one per accepted transaction header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    TopUp,
    Bonus,
    Purchase,
}

impl TransactionKind {
    /// Stable code stored in `transaction_types`
    pub fn code(&self) -> &'static str {
        match self {
            Self::TopUp => "TOP_UP",
            Self::Bonus => "BONUS",
            Self::Purchase => "PURCHASE",
        }
    }
}

/// Lifecycle status of a transaction header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(rename_all = "lowercase"))]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Reversed,
}

/// Closed set of account classifications
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountKind {
    User,
    SystemTreasury,
    SystemRevenue,
    SystemBonus,
    SystemReserve,
}

impl AccountKind {
    /// Stable code stored in `account_types`
    pub fn code(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::SystemTreasury => "SYSTEM_TREASURY",
            Self::SystemRevenue => "SYSTEM_REVENUE",
            Self::SystemBonus => "SYSTEM_BONUS",
            Self::SystemReserve => "SYSTEM_RESERVE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_match_serde_names() {
        assert_eq!(
            serde_json::to_string(&TransactionKind::TopUp).unwrap(),
            "\"TOP_UP\""
        );
        assert_eq!(
            serde_json::to_string(&AccountKind::SystemTreasury).unwrap(),
            format!("\"{}\"", AccountKind::SystemTreasury.code())
        );
        assert_eq!(serde_json::to_string(&EntryType::Debit).unwrap(), "\"debit\"");
    }
}
