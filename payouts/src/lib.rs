//! Mandi Payouts
//!
//! Withdrawal requests against wallet balances, with funds escrowed at
//! request time.
//!
//! # Lifecycle
//!
//! ```text
//! Pending --> Processing --> Completed
//!    |            |
//!    |            +--> Failed      (admin rejects, escrow refunded)
//!    +--> Failed                   (admin rejects, escrow refunded)
//!    +--> Cancelled                (requester withdraws, escrow refunded)
//! ```
//!
//! # Escrow Model
//!
//! - Filing a request debits the full amount from the wallet before the
//!   request is recorded; an insufficient balance fails the request and
//!   leaves nothing behind
//! - Approval moves no funds, it marks the escrowed debit completed
//! - Rejection and cancellation release the escrow first and then credit
//!   the amount back; the ledger issues at most one refund per payout, so
//!   a resolution interrupted between the two steps can be retried safely
//!
//! # Invariants
//!
//! - Every payout record points at exactly one escrow debit transaction
//! - `Completed`, `Failed` and `Cancelled` are terminal
//! - Only admins approve or reject; only the requester cancels, and only
//!   while the request is still `Pending`

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod error;
pub mod storage;
pub mod types;
pub mod workflow;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use storage::Storage;
pub use types::{PayoutMethod, PayoutRequest, PayoutStatus};
pub use workflow::Payouts;
