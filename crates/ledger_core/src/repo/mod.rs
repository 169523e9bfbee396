//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Repositories never open their own transactions; they run on whatever
//!   handle they are given, so a `rusqlite::Transaction` makes every call
//!   part of the caller's unit of work.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod blog_repo;
pub mod ledger_repo;
