//! Configuration for the order store

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use wallet_ledger::config::RocksDbConfig;
use wallet_ledger::Currency;

/// Order store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Prefix for generated order numbers
    pub order_prefix: String,

    /// Currency orders are priced in
    pub currency: Currency,

    /// RocksDB tuning
    pub rocksdb: RocksDbConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/order-core"),
            order_prefix: "MND".to_string(),
            currency: Currency::INR,
            rocksdb: RocksDbConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(dir) = std::env::var("ORDERS_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(prefix) = std::env::var("ORDERS_PREFIX") {
            config.order_prefix = prefix;
        }

        config
    }
}
