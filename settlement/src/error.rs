//! Error types for revenue distribution

use thiserror::Error;

/// Result type for settlement operations
pub type Result<T> = std::result::Result<T, Error>;

/// Settlement errors
#[derive(Error, Debug)]
pub enum Error {
    /// Wallet ledger error
    #[error("Ledger error: {0}")]
    Ledger(#[from] wallet_ledger::Error),

    /// Order store error
    #[error("Order error: {0}")]
    Order(#[from] order_core::Error),

    /// Order is not delivered-and-paid
    #[error("Not eligible for settlement: {0}")]
    NotEligible(String),

    /// Split computation error
    #[error("Split error: {0}")]
    Split(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
