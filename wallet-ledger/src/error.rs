//! Error types for the wallet ledger

use rust_decimal::Decimal;
use thiserror::Error;

/// Wallet ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Storage layer error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Amount is zero, negative or otherwise unusable
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Debit would overdraw the wallet
    #[error("Insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance {
        /// Amount the debit asked for
        requested: Decimal,
        /// Spendable balance at the time of the check
        available: Decimal,
    },

    /// Wallet not found
    #[error("Wallet not found: {0}")]
    WalletNotFound(String),

    /// Transaction not found
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Illegal transaction status change
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Actor mailbox or reply channel failure
    #[error("Concurrency error: {0}")]
    Concurrency(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Metrics error
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(e: rocksdb::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

impl From<prometheus::Error> for Error {
    fn from(e: prometheus::Error) -> Self {
        Error::Metrics(e.to_string())
    }
}

/// Result type for wallet ledger operations
pub type Result<T> = std::result::Result<T, Error>;
