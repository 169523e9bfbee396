//! Ledger store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Read and overwrite account balances.
//! - Append and enumerate immutable transfer records.
//!
//! # Invariants
//! - Money is persisted as integer cents; values that cannot be represented
//!   exactly are rejected before any SQL runs.
//! - `transactions` rows are never updated or deleted.

use crate::db::DbError;
use crate::model::account::{
    Account, AccountId, NewTransactionRecord, TransactionId, TransactionRecord,
};
use crate::model::money::{from_minor_units, to_minor_units};
use rust_decimal::Decimal;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by ledger and blog persistence.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound { entity: &'static str, id: i64 },
    InvalidData(String),
    MissingRequiredTable(&'static str),
}

impl RepoError {
    pub(crate) fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid data: {message}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table `{table}` is missing; run migrations first")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage contract for accounts and the transfer log.
pub trait LedgerStore {
    /// Creates an account with the given opening balance.
    fn open_account(&self, initial_balance: Decimal) -> RepoResult<Account>;
    /// Loads one account; `NotFound` when absent.
    fn get_account(&self, id: AccountId) -> RepoResult<Account>;
    /// Lists all accounts in id order.
    fn list_accounts(&self) -> RepoResult<Vec<Account>>;
    /// Overwrites the stored balance; `NotFound` when absent.
    fn set_balance(&self, id: AccountId, new_balance: Decimal) -> RepoResult<()>;
    /// Appends one immutable transfer record.
    fn append_transaction(&self, record: &NewTransactionRecord) -> RepoResult<TransactionRecord>;
    /// Lists transfer records in insertion order.
    fn list_transactions(&self) -> RepoResult<Vec<TransactionRecord>>;
}

/// SQLite-backed ledger store.
///
/// Accepts a plain `Connection` or, through deref, a `Transaction`.
pub struct SqliteLedgerStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLedgerStore<'conn> {
    /// Constructs a store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["accounts", "transactions"])?;
        Ok(Self { conn })
    }

    /// Wraps a handle whose schema the caller has already verified.
    pub(crate) fn new_unchecked(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl LedgerStore for SqliteLedgerStore<'_> {
    fn open_account(&self, initial_balance: Decimal) -> RepoResult<Account> {
        let cents = money_to_cents(initial_balance, "balance")?;
        self.conn.execute(
            "INSERT INTO accounts (balance_cents) VALUES (?1);",
            params![cents],
        )?;

        Ok(Account {
            id: self.conn.last_insert_rowid(),
            balance: from_minor_units(cents),
        })
    }

    fn get_account(&self, id: AccountId) -> RepoResult<Account> {
        self.conn
            .query_row(
                "SELECT id, balance_cents FROM accounts WHERE id = ?1;",
                params![id],
                parse_account_row,
            )
            .optional()?
            .ok_or_else(|| RepoError::not_found("account", id))
    }

    fn list_accounts(&self) -> RepoResult<Vec<Account>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, balance_cents FROM accounts ORDER BY id ASC;")?;
        let accounts = stmt
            .query_map([], parse_account_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(accounts)
    }

    fn set_balance(&self, id: AccountId, new_balance: Decimal) -> RepoResult<()> {
        let cents = money_to_cents(new_balance, "balance")?;
        let changed = self.conn.execute(
            "UPDATE accounts
             SET
                balance_cents = ?1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?2;",
            params![cents, id],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found("account", id));
        }

        Ok(())
    }

    fn append_transaction(&self, record: &NewTransactionRecord) -> RepoResult<TransactionRecord> {
        if record.amount <= Decimal::ZERO {
            return Err(RepoError::InvalidData(format!(
                "transfer amount must be positive, got {}",
                record.amount
            )));
        }
        let cents = money_to_cents(record.amount, "amount")?;

        self.conn.execute(
            "INSERT INTO transactions (
                from_account_id,
                to_account_id,
                amount_cents
            ) VALUES (?1, ?2, ?3);",
            params![record.from_account_id, record.to_account_id, cents],
        )?;

        let id: TransactionId = self.conn.last_insert_rowid();
        Ok(TransactionRecord {
            amount: from_minor_units(cents),
            ..record.into_record(id)
        })
    }

    fn list_transactions(&self) -> RepoResult<Vec<TransactionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                id,
                from_account_id,
                to_account_id,
                amount_cents
             FROM transactions
             ORDER BY id ASC;",
        )?;
        let records = stmt
            .query_map([], |row| {
                Ok(TransactionRecord {
                    id: row.get("id")?,
                    from_account_id: row.get("from_account_id")?,
                    to_account_id: row.get("to_account_id")?,
                    amount: from_minor_units(row.get("amount_cents")?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }
}

fn parse_account_row(row: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: row.get("id")?,
        balance: from_minor_units(row.get("balance_cents")?),
    })
}

fn money_to_cents(value: Decimal, field: &str) -> RepoResult<i64> {
    to_minor_units(value).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "{field} `{value}` is not representable with two decimal places"
        ))
    })
}

pub(crate) fn ensure_tables(conn: &Connection, tables: &[&'static str]) -> RepoResult<()> {
    for &table in tables {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{LedgerStore, RepoError, SqliteLedgerStore};
    use rusqlite::Connection;
    use rust_decimal_macros::dec;

    #[test]
    fn try_new_rejects_unmigrated_connection() {
        let conn = Connection::open_in_memory().unwrap();
        let err = SqliteLedgerStore::try_new(&conn).err().unwrap();
        assert!(matches!(err, RepoError::MissingRequiredTable("accounts")));
    }

    #[test]
    fn open_account_rejects_sub_cent_balance() {
        let conn = crate::db::open_db_in_memory().unwrap();
        let store = SqliteLedgerStore::try_new(&conn).unwrap();
        let err = store.open_account(dec!(1.005)).unwrap_err();
        assert!(matches!(err, RepoError::InvalidData(_)));
        assert!(store.list_accounts().unwrap().is_empty());
    }
}
