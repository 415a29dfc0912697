//! Mandi Order Core
//!
//! Order lifecycle for a multi-vendor marketplace: catalog stock,
//! order creation with price snapshots, the status state machine, the
//! courier delivery leg and payment state.
//!
//! # Architecture
//!
//! - **Single Writer**: Every mutation validates and commits under one
//!   store-wide lock, so stock check-and-decrement and courier
//!   assignment are race-free
//! - **Atomic Commits**: An order write and its stock side effects land
//!   in the same RocksDB WriteBatch
//! - **Server-Side Pricing**: Order totals are computed from catalog
//!   prices at creation time; client-supplied prices do not exist
//!
//! # Invariants
//!
//! - Stock never goes negative; an oversell attempt fails the whole order
//! - Cancellation restores exactly the stock the order decremented
//! - `Cancelled` and `Refunded` are absorbing; no status leaves them
//! - An order becomes settlement-ready exactly when it is both
//!   `Delivered` and `Paid`, whichever event lands second

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod error;
pub mod orders;
pub mod storage;
pub mod types;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use orders::Orders;
pub use storage::Storage;
pub use types::{
    Address, CreateOrderRequest, DeliveryStatus, Order, OrderItem, OrderLine, OrderStatus,
    PaymentConfirmation, PaymentMethod, PaymentStatus, Product, StatusChange,
};
