//! Error types for order operations

use thiserror::Error;

/// Order store errors
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

    /// Order not found
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Product not found
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Requested quantity exceeds stock
    #[error("Out of stock: {product} has {available} units, {requested} requested")]
    OutOfStock {
        /// Product name
        product: String,
        /// Units requested
        requested: u32,
        /// Units in stock
        available: u32,
    },

    /// Listing is closed for purchase
    #[error("Product unavailable: {0}")]
    ProductUnavailable(String),

    /// Caller lacks the role or ownership for this operation
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Illegal state machine move
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Another courier already holds this order
    #[error("Order already assigned: {0}")]
    AlreadyAssigned(String),

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

/// Result type for order operations
pub type Result<T> = std::result::Result<T, Error>;
