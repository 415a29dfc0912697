//! Error types for payout operations

use thiserror::Error;
use uuid::Uuid;

/// Payout workflow errors
#[derive(Error, Debug)]
pub enum Error {
    /// Storage layer error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Malformed or missing input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Payout not found
    #[error("Payout not found: {0}")]
    PayoutNotFound(Uuid),

    /// Illegal state machine move
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Caller lacks the role or ownership for this operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Wallet ledger error (insufficient balance surfaces here)
    #[error("Ledger error: {0}")]
    Ledger(#[from] wallet_ledger::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(e: rocksdb::Error) -> Self {
        Error::Storage(e.to_string())
    }
}

/// Result type for payout operations
pub type Result<T> = std::result::Result<T, Error>;
