//! Database access layer
//!
//! One module per relation group. Functions taking `&PgPool` run standalone;
//! functions taking `&mut PgConnection` expect the caller's open transaction.

pub mod accounts;
pub mod assets;
pub mod audit;
pub mod balances;
pub mod idempotency;
pub mod ledger;
