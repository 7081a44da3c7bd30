//! Wire models (API DTOs)
//!
//! These types cross the boundary between the ledger engine and its
//! transport layer. ID fields are UUIDs; amounts are fixed-point decimals.

pub mod balance;
pub mod ledger;
pub mod movement;

// Re-exports
pub use balance::*;
pub use ledger::*;
pub use movement::*;
