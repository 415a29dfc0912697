//! Configuration for the payout workflow

use crate::error::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use wallet_ledger::config::RocksDbConfig;

/// Payout workflow configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Smallest payout a user may request, in currency units
    pub min_amount: Decimal,

    /// RocksDB tuning
    pub rocksdb: RocksDbConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/payouts"),
            min_amount: Decimal::new(100, 0),
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

        if let Ok(dir) = std::env::var("PAYOUTS_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Ok(min) = std::env::var("PAYOUTS_MIN_AMOUNT") {
            if let Ok(amount) = min.parse() {
                config.min_amount = amount;
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.min_amount, dec!(100));
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.min_amount, config.min_amount);
        assert_eq!(parsed.data_dir, config.data_dir);
    }
}
