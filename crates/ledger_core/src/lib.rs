//! Core domain logic for the ledger.
//!
//! - [`TransferEngine`] moves funds between accounts in one SQLite
//!   transaction and appends an immutable audit record.
//! - [`BlogService`] keeps denormalized blog counters in step with writes.
//!
//! Connections are always passed in explicitly; open them with
//! [`db::open_db`] or [`db::open_db_in_memory`].

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use model::account::{Account, AccountId, NewTransactionRecord, TransactionId, TransactionRecord};
pub use model::blog::{
    Comment, CommentId, CommentStatus, CommentView, Post, PostDetail, PostId, PostWithComments,
    User, UserId, UserPosts,
};
pub use repo::blog_repo::{BlogRepository, SqliteBlogRepository};
pub use repo::ledger_repo::{LedgerStore, RepoError, RepoResult, SqliteLedgerStore};
pub use service::blog_service::{BlogService, BlogServiceError, CommentDeletion};
pub use service::transfer_service::{
    AccountRole, TransferEngine, TransferError, TransferReceipt, TransferState, TransferStep,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
