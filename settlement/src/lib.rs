//! Mandi Settlement
//!
//! Revenue distribution for delivered-and-paid marketplace orders.
//!
//! # Flow
//!
//! 1. **Eligibility**: the order must be `Delivered` with payment `Paid`
//! 2. **Split**: percentages apply to the total net of the shipping fee;
//!    the fee goes to the courier in full, and the platform share absorbs
//!    any rounding residual so the shares sum exactly to the total
//! 3. **Credit**: the shares go to the wallet ledger as one atomic
//!    settlement; the ledger's per-order idempotency guard makes repeat
//!    and concurrent triggers harmless
//!
//! The platform share lands in a configured platform wallet, not in
//! whichever admin account happens to exist at distribution time.
//!
//! # Example
//!
//! ```no_run
//! use settlement::{Config, SettlementEngine};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> settlement::Result<()> {
//!     let orders = Arc::new(order_core::Orders::open(order_core::Config::default())?);
//!     let ledger = Arc::new(wallet_ledger::WalletLedger::open(
//!         wallet_ledger::Config::default(),
//!     ).await?);
//!
//!     let engine = SettlementEngine::new(orders, ledger, Config::default())?;
//!     let distribution = engine.distribute("MND-20250114-A1B2C3").await?;
//!     println!("seller share: {}", distribution.split.seller);
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod engine;
pub mod error;
pub mod split;

// Re-exports
pub use config::{Config, SplitConfig};
pub use engine::{Distribution, SettlementEngine};
pub use error::{Error, Result};
pub use split::RevenueSplit;
