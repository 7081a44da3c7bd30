//! Engine error type and storage error classification
//!
//! `EngineError` bridges the gap between driver-level errors (`sqlx::Error`)
//! and the API-layer error (`AppError`). Transient concurrency failures are
//! distinguishable via [`EngineError::is_retriable`] so the retry driver can
//! absorb them; everything else propagates with a stable kind.

use rust_decimal::Decimal;
use shared::error::AppError;
use thiserror::Error;

/// Classification of native driver errors by SQLSTATE
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    /// 40001: serializable transactions could not be ordered
    SerializationFailure,
    /// 40P01: circular wait broken by the server
    DeadlockDetected,
    /// 55P03: a NOWAIT lock request found the row contended
    LockNotAvailable,
    /// 23505: unique constraint violated
    UniqueViolation,
    /// 23514: check constraint violated
    CheckViolation,
    /// No row matched
    NotFound,
    /// Anything else
    Other,
}

impl StorageErrorKind {
    /// Map a PostgreSQL SQLSTATE code to a kind
    pub fn from_sqlstate(code: &str) -> Self {
        match code {
            "40001" => Self::SerializationFailure,
            "40P01" => Self::DeadlockDetected,
            "55P03" => Self::LockNotAvailable,
            "23505" => Self::UniqueViolation,
            "23514" => Self::CheckViolation,
            _ => Self::Other,
        }
    }

    /// Classify a driver error
    pub fn of(err: &sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => Self::NotFound,
            sqlx::Error::Database(db) => db
                .code()
                .map(|c| Self::from_sqlstate(&c))
                .unwrap_or(Self::Other),
            _ => Self::Other,
        }
    }

    /// True for conflicts that left no state behind and are safe to retry
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::SerializationFailure | Self::DeadlockDetected | Self::LockNotAvailable
        )
    }
}

/// Unified error for all engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed input; fatal to the request
    #[error("validation failed: {0}")]
    Validation(String),

    /// Referenced account or asset absent or inactive; fatal
    #[error("{0} not found")]
    NotFound(String),

    /// Source balance below the requested amount; fatal, never retried
    #[error("insufficient funds: requested {requested}, available {available}")]
    InsufficientFunds {
        requested: Decimal,
        available: Decimal,
    },

    /// Idempotency key reused with a different payload; fatal
    #[error("idempotency conflict: {0}")]
    Conflict(String),

    /// Driver-level failure, classified via [`StorageErrorKind`]
    #[error(transparent)]
    Storage(#[from] sqlx::Error),

    /// Unclassified engine failure; surfaced with an opaque message for log
    /// correlation
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    /// Storage classification, when this is a driver error
    pub fn storage_kind(&self) -> Option<StorageErrorKind> {
        match self {
            Self::Storage(err) => Some(StorageErrorKind::of(err)),
            _ => None,
        }
    }

    /// True when the retry driver may re-run the movement
    pub fn is_retriable(&self) -> bool {
        self.storage_kind().is_some_and(|k| k.is_retriable())
    }

    /// True when another worker won an idempotency-key insert race
    pub fn is_unique_violation(&self) -> bool {
        self.storage_kind() == Some(StorageErrorKind::UniqueViolation)
    }
}

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Validation(msg) => AppError::validation(msg),
            EngineError::NotFound(resource) => AppError::not_found(resource),
            EngineError::InsufficientFunds {
                requested,
                available,
            } => AppError::insufficient_funds(format!(
                "requested {requested}, available {available}"
            ))
            .with_detail("requested", requested.to_string())
            .with_detail("available", available.to_string()),
            EngineError::Conflict(msg) => AppError::conflict(msg),
            EngineError::Storage(db_err) => {
                tracing::error!(error = %db_err, "Engine storage error");
                AppError::database("storage failure")
            }
            EngineError::Internal(msg) => {
                tracing::error!(error = %msg, "Engine internal error");
                AppError::internal("internal failure")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use shared::error::ErrorCode;

    #[test]
    fn test_sqlstate_classification() {
        assert_eq!(
            StorageErrorKind::from_sqlstate("40001"),
            StorageErrorKind::SerializationFailure
        );
        assert_eq!(
            StorageErrorKind::from_sqlstate("40P01"),
            StorageErrorKind::DeadlockDetected
        );
        assert_eq!(
            StorageErrorKind::from_sqlstate("55P03"),
            StorageErrorKind::LockNotAvailable
        );
        assert_eq!(
            StorageErrorKind::from_sqlstate("23505"),
            StorageErrorKind::UniqueViolation
        );
        assert_eq!(
            StorageErrorKind::from_sqlstate("23514"),
            StorageErrorKind::CheckViolation
        );
        assert_eq!(StorageErrorKind::from_sqlstate("42P01"), StorageErrorKind::Other);
    }

    #[test]
    fn test_retriable_kinds() {
        assert!(StorageErrorKind::SerializationFailure.is_retriable());
        assert!(StorageErrorKind::DeadlockDetected.is_retriable());
        assert!(StorageErrorKind::LockNotAvailable.is_retriable());
        assert!(!StorageErrorKind::UniqueViolation.is_retriable());
        assert!(!StorageErrorKind::CheckViolation.is_retriable());
        assert!(!StorageErrorKind::NotFound.is_retriable());
        assert!(!StorageErrorKind::Other.is_retriable());
    }

    #[test]
    fn test_domain_errors_never_retried() {
        let err = EngineError::InsufficientFunds {
            requested: dec!(10_000),
            available: dec!(575),
        };
        assert!(!err.is_retriable());
        assert!(!EngineError::Validation("bad".into()).is_retriable());
        assert!(!EngineError::Conflict("reused".into()).is_retriable());
    }

    #[test]
    fn test_app_error_mapping() {
        let app: AppError = EngineError::Validation("amount must be positive".into()).into();
        assert_eq!(app.code, ErrorCode::ValidationFailed);

        let app: AppError = EngineError::NotFound("asset GOLD_COIN".into()).into();
        assert_eq!(app.code, ErrorCode::NotFound);

        let app: AppError = EngineError::InsufficientFunds {
            requested: dec!(100),
            available: dec!(25),
        }
        .into();
        assert_eq!(app.code, ErrorCode::InsufficientFunds);
        let details = app.details.unwrap();
        assert_eq!(details.get("available").unwrap(), "25");

        let app: AppError = EngineError::Conflict("key reused".into()).into();
        assert_eq!(app.code, ErrorCode::IdempotencyConflict);
    }
}
