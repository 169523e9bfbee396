//! Domain model for ledger accounts, transfer records and blog entities.
//!
//! # Invariants
//! - Every persisted record is identified by a store-assigned integer id.
//! - Money values carry at most two fractional digits.

pub mod account;
pub mod blog;
pub mod money;
