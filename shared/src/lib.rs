//! Shared types for the wallet platform
//!
//! Common types used by the ledger engine and its (external) transport
//! layer: error codes, the structured error type, and the wire models for
//! movement requests, receipts, balances and history.

pub mod error;
pub mod models;

// Re-exports
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{AppError, ErrorCode};
