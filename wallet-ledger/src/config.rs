//! Configuration for the wallet ledger

use crate::error::{Error, Result};
use crate::types::Currency;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Wallet ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name for logging
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Currency new wallets are opened in
    pub currency: Currency,

    /// RocksDB tuning
    pub rocksdb: RocksDbConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/wallet-ledger"),
            service_name: "wallet-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
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

        if let Ok(dir) = std::env::var("WALLET_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(currency) = std::env::var("WALLET_CURRENCY") {
            if let Some(c) = Currency::from_str(&currency) {
                config.currency = c;
            }
        }

        config
    }
}

/// RocksDB tuning parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDbConfig {
    /// Memtable size in MB
    pub write_buffer_size_mb: usize,

    /// Number of memtables per column family
    pub max_write_buffer_number: i32,

    /// Background compaction/flush jobs
    pub max_background_jobs: i32,

    /// Collect RocksDB statistics
    pub enable_statistics: bool,
}

impl Default for RocksDbConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 256,
            max_write_buffer_number: 4,
            max_background_jobs: 4,
            enable_statistics: false,
        }
    }
}
