//! Mandi Wallet Ledger
//!
//! Per-user wallet balances backed by an append-only transaction log.
//!
//! # Architecture
//!
//! - **Single Writer**: All balance mutations flow through one actor task,
//!   which makes read-modify-write on balances race-free
//! - **Durable Replies**: A mutation is committed to RocksDB before its
//!   caller's future resolves
//! - **Append-Only Log**: Every mutation writes exactly one immutable
//!   transaction record beside the wallet update, in the same WriteBatch
//!
//! # Invariants
//!
//! - `available >= 0` for every wallet at all times
//! - `balance_after - balance_before` equals `+amount` for credits and
//!   `-amount` for debits on every transaction record
//! - Revenue distribution is idempotent per order

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod storage;
pub mod types;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use ledger::WalletLedger;
pub use metrics::Metrics;
pub use storage::Storage;
pub use types::{
    Actor, CreditRequest, Currency, DebitRequest, EntryKind, Page, RevenueCategory, Role,
    SettlementOutcome, ShareCredit, TransactionRecord, TransactionStatus, UserId, Wallet,
};
