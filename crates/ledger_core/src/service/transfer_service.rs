//! Funds transfer use-case.
//!
//! # Responsibility
//! - Move money between two ledger accounts inside one unit of work.
//! - Reject transfers that would overdraw the source account.
//! - Append exactly one audit record per committed transfer.
//!
//! # Invariants
//! - On any error the unit of work is rolled back before the error is
//!   returned; callers always observe the pre-transfer state.
//! - A `TransactionRecord` is never visible without both balance writes.
//! - No retries: each call is a terminal attempt.
//!
//! # State machine
//! `Started -> BalanceChecked -> Debited -> Credited -> Recorded -> Committed`,
//! or any non-terminal state `-> RolledBack`.

use crate::model::account::{AccountId, NewTransactionRecord, TransactionRecord};
use crate::model::money::is_representable;
use crate::repo::ledger_repo::{
    ensure_tables, LedgerStore, RepoError, RepoResult, SqliteLedgerStore,
};
use log::{debug, error, info, warn};
use rusqlite::{Connection, TransactionBehavior};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

/// Which side of a transfer an account plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountRole {
    Source,
    Destination,
}

impl AccountRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Destination => "destination",
        }
    }
}

/// Storage operation that failed inside a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStep {
    Begin,
    LoadSource,
    Debit,
    LoadDestination,
    Credit,
    Record,
}

impl TransferStep {
    fn describe(self) -> &'static str {
        match self {
            Self::Begin => "beginning unit of work",
            Self::LoadSource => "loading source account",
            Self::Debit => "debiting source account",
            Self::LoadDestination => "loading destination account",
            Self::Credit => "crediting destination account",
            Self::Record => "recording transaction",
        }
    }
}

/// Progress of a single transfer invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Started,
    BalanceChecked,
    Debited,
    Credited,
    Recorded,
    Committed,
    RolledBack,
}

impl TransferState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::BalanceChecked => "balance_checked",
            Self::Debited => "debited",
            Self::Credited => "credited",
            Self::Recorded => "recorded",
            Self::Committed => "committed",
            Self::RolledBack => "rolled_back",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::RolledBack)
    }
}

/// Transfer failure. Every variant implies nothing was persisted.
#[derive(Debug)]
pub enum TransferError {
    /// Amount is not positive or has sub-cent precision.
    InvalidAmount(Decimal),
    AccountNotFound {
        account_id: AccountId,
        role: AccountRole,
    },
    InsufficientFunds {
        account_id: AccountId,
        available: Decimal,
        requested: Decimal,
    },
    /// A read or write inside the unit of work failed.
    Storage {
        step: TransferStep,
        source: RepoError,
    },
    CommitFailed(RepoError),
}

impl TransferError {
    /// Stable machine-readable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "invalid_amount",
            Self::AccountNotFound { .. } => "account_not_found",
            Self::InsufficientFunds { .. } => "insufficient_funds",
            Self::Storage { .. } => "storage_failure",
            Self::CommitFailed(_) => "commit_failed",
        }
    }
}

impl Display for TransferError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidAmount(amount) => write!(
                f,
                "invalid transfer amount {amount}: must be positive with at most two decimal places"
            ),
            Self::AccountNotFound { account_id, role } => {
                write!(f, "{} account not found: {account_id}", role.as_str())
            }
            Self::InsufficientFunds {
                account_id,
                available,
                requested,
            } => write!(
                f,
                "insufficient funds in account {account_id}: available {available}, requested {requested}"
            ),
            Self::Storage { step, source } => {
                write!(f, "transfer failed while {}: {source}", step.describe())
            }
            Self::CommitFailed(err) => write!(f, "transfer failed while committing: {err}"),
        }
    }
}

impl Error for TransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Storage { source, .. } => Some(source),
            Self::CommitFailed(err) => Some(err),
            _ => None,
        }
    }
}

/// Result of a committed transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// Audit entry appended for this transfer.
    pub record: TransactionRecord,
    /// Source balance after commit.
    pub source_balance: Decimal,
    /// Destination balance after commit.
    pub destination_balance: Decimal,
}

/// Transfer orchestrator bound to an explicitly passed connection.
pub struct TransferEngine<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> TransferEngine<'conn> {
    /// Creates an engine over a migrated connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["accounts", "transactions"])?;
        Ok(Self { conn })
    }

    /// Read access to the ledger outside any transfer.
    pub fn ledger(&self) -> SqliteLedgerStore<'_> {
        SqliteLedgerStore::new_unchecked(&*self.conn)
    }

    /// Moves `amount` from `from_id` to `to_id` atomically.
    ///
    /// # Contract
    /// - `amount` must be positive with at most two decimal places.
    /// - `from_id == to_id` is accepted: net-zero balance change, one record.
    /// - Fails with `InsufficientFunds` when the source balance is below
    ///   `amount`; fails with `AccountNotFound` for unknown ids.
    ///
    /// # Side effects
    /// - Success: one debit, one credit, one transaction record.
    /// - Failure: none; the unit of work is rolled back before returning.
    pub fn transfer(
        &mut self,
        from_id: AccountId,
        to_id: AccountId,
        amount: Decimal,
    ) -> Result<TransferReceipt, TransferError> {
        let started_at = Instant::now();
        if amount <= Decimal::ZERO || !is_representable(amount) {
            warn!(
                "event=transfer module=service status=rejected error_code=invalid_amount from={from_id} to={to_id} amount={amount}"
            );
            return Err(TransferError::InvalidAmount(amount));
        }

        info!("event=transfer module=service status=start from={from_id} to={to_id} amount={amount}");

        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|err| {
                let err = TransferError::Storage {
                    step: TransferStep::Begin,
                    source: err.into(),
                };
                log_failure(&err, TransferState::Started, started_at);
                err
            })?;

        let mut state = TransferState::Started;
        let outcome = {
            let store = SqliteLedgerStore::new_unchecked(&tx);
            apply_transfer(&store, from_id, to_id, amount, &mut state)
        };

        let receipt = match outcome {
            Ok(receipt) => receipt,
            Err(err) => {
                if let Err(rollback_err) = tx.rollback() {
                    error!(
                        "event=transfer_rollback module=service status=error from_state={} error={rollback_err}",
                        state.as_str()
                    );
                }
                log_failure(&err, state, started_at);
                return Err(err);
            }
        };

        if let Err(commit_err) = tx.commit() {
            ensure_rolled_back(self.conn);
            let err = TransferError::CommitFailed(commit_err.into());
            log_failure(&err, state, started_at);
            return Err(err);
        }
        state = TransferState::Committed;

        info!(
            "event=transfer module=service status=ok state={} transaction_id={} duration_ms={}",
            state.as_str(),
            receipt.record.id,
            started_at.elapsed().as_millis()
        );
        Ok(receipt)
    }
}

/// Runs the read/check/write steps of a transfer against `store`.
///
/// Leaves `state` at the last stage reached. Does not commit or roll back;
/// the caller owns the unit of work.
pub(crate) fn apply_transfer<S: LedgerStore>(
    store: &S,
    from_id: AccountId,
    to_id: AccountId,
    amount: Decimal,
    state: &mut TransferState,
) -> Result<TransferReceipt, TransferError> {
    let source = store
        .get_account(from_id)
        .map_err(|err| load_failure(err, from_id, AccountRole::Source))?;
    if source.balance < amount {
        return Err(TransferError::InsufficientFunds {
            account_id: from_id,
            available: source.balance,
            requested: amount,
        });
    }
    advance(state, TransferState::BalanceChecked);

    let debited = source.balance - amount;
    store
        .set_balance(from_id, debited)
        .map_err(|source| TransferError::Storage {
            step: TransferStep::Debit,
            source,
        })?;
    advance(state, TransferState::Debited);

    let destination = store
        .get_account(to_id)
        .map_err(|err| load_failure(err, to_id, AccountRole::Destination))?;
    let credited = destination
        .balance
        .checked_add(amount)
        .ok_or_else(|| TransferError::Storage {
            step: TransferStep::Credit,
            source: RepoError::InvalidData(format!(
                "balance overflow crediting {amount} to account {to_id}"
            )),
        })?;
    store
        .set_balance(to_id, credited)
        .map_err(|source| TransferError::Storage {
            step: TransferStep::Credit,
            source,
        })?;
    advance(state, TransferState::Credited);

    let record = store
        .append_transaction(&NewTransactionRecord::new(from_id, to_id, amount))
        .map_err(|source| TransferError::Storage {
            step: TransferStep::Record,
            source,
        })?;
    advance(state, TransferState::Recorded);

    // Self-transfers credit the row they just debited.
    let source_balance = if from_id == to_id { credited } else { debited };
    Ok(TransferReceipt {
        record,
        source_balance,
        destination_balance: credited,
    })
}

fn load_failure(err: RepoError, account_id: AccountId, role: AccountRole) -> TransferError {
    match err {
        RepoError::NotFound { .. } => TransferError::AccountNotFound { account_id, role },
        source => TransferError::Storage {
            step: match role {
                AccountRole::Source => TransferStep::LoadSource,
                AccountRole::Destination => TransferStep::LoadDestination,
            },
            source,
        },
    }
}

fn advance(state: &mut TransferState, next: TransferState) {
    debug!(
        "event=transfer_state module=service from_state={} to_state={}",
        state.as_str(),
        next.as_str()
    );
    *state = next;
}

fn ensure_rolled_back(conn: &Connection) {
    if conn.is_autocommit() {
        return;
    }
    if let Err(err) = conn.execute_batch("ROLLBACK;") {
        error!("event=transfer_rollback module=service status=error error={err}");
    }
}

fn log_failure(err: &TransferError, from_state: TransferState, started_at: Instant) {
    let message = format!(
        "event=transfer module=service status=error state={} from_state={} error_code={} duration_ms={} error={err}",
        TransferState::RolledBack.as_str(),
        from_state.as_str(),
        err.code(),
        started_at.elapsed().as_millis()
    );
    match err {
        TransferError::Storage { .. } | TransferError::CommitFailed(_) => error!("{message}"),
        _ => warn!("{message}"),
    }
}
