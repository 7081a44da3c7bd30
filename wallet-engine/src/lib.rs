//! wallet-engine: transactional ledger engine for the wallet platform
//!
//! Records user holdings of virtual assets, mediates movements between user
//! wallets and system pools, and exposes balances and history for query.
//! Every movement is executed as one serializable database transaction that
//! appends a transaction header, exactly two ledger entries (one debit, one
//! credit), and the matching balance-cache updates. Client-supplied
//! idempotency keys make movement requests safely repeatable; transient
//! serialization and lock conflicts are absorbed by bounded retry.
//!
//! The engine is consumed as a library: it owns a [`sqlx::PgPool`] and emits
//! `tracing` events, and knows nothing about HTTP.

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod retry;
pub mod store;
pub mod util;

pub use config::Config;
pub use engine::LedgerEngine;
pub use error::{EngineError, StorageErrorKind};
pub use retry::RetryPolicy;
