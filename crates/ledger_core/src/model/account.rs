//! Ledger account and transfer record models.
//!
//! # Invariants
//! - `TransactionRecord` values are immutable once persisted.
//! - A non-negative balance is enforced by the transfer engine, not here.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Store-assigned account identifier.
pub type AccountId = i64;

/// Store-assigned transfer record identifier.
pub type TransactionId = i64;

/// Balance-holding ledger account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    /// Two-decimal fixed-point balance.
    pub balance: Decimal,
}

/// Audit entry for one committed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: TransactionId,
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    /// Always positive.
    pub amount: Decimal,
}

/// Transfer record before the store assigns its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewTransactionRecord {
    pub from_account_id: AccountId,
    pub to_account_id: AccountId,
    pub amount: Decimal,
}

impl NewTransactionRecord {
    pub fn new(from_account_id: AccountId, to_account_id: AccountId, amount: Decimal) -> Self {
        Self {
            from_account_id,
            to_account_id,
            amount,
        }
    }

    /// Attaches the persisted id.
    pub fn into_record(self, id: TransactionId) -> TransactionRecord {
        TransactionRecord {
            id,
            from_account_id: self.from_account_id,
            to_account_id: self.to_account_id,
            amount: self.amount,
        }
    }
}
