//! Configuration for the revenue distribution engine

use crate::error::{Error, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use wallet_ledger::UserId;

/// Revenue distribution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Wallet that receives the platform share
    ///
    /// A fixed configured identity; the engine never goes looking for an
    /// admin user at distribution time.
    pub platform_account: UserId,

    /// Share percentages
    pub split: SplitConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            platform_account: UserId::new("platform"),
            split: SplitConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config =
            toml::from_str(&contents).map_err(|e| Error::Config(e.to_string()))?;
        config.split.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(account) = std::env::var("SETTLEMENT_PLATFORM_ACCOUNT") {
            config.platform_account = UserId::new(account);
        }

        config
    }
}

/// Share percentages for the seller / courier / platform split
///
/// The percentages apply to the order total net of the shipping fee; the
/// shipping fee itself goes to the courier on top of the courier share.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Seller's fraction of the net base
    pub seller_pct: Decimal,

    /// Courier's fraction of the net base
    pub courier_pct: Decimal,

    /// Platform's fraction of the net base
    pub platform_pct: Decimal,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            seller_pct: Decimal::new(80, 2),
            courier_pct: Decimal::new(10, 2),
            platform_pct: Decimal::new(10, 2),
        }
    }
}

impl SplitConfig {
    /// Build a validated split configuration
    pub fn new(seller_pct: Decimal, courier_pct: Decimal, platform_pct: Decimal) -> Result<Self> {
        let config = Self {
            seller_pct,
            courier_pct,
            platform_pct,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check that the percentages are non-negative and sum to exactly 1
    pub fn validate(&self) -> Result<()> {
        if self.seller_pct < Decimal::ZERO
            || self.courier_pct < Decimal::ZERO
            || self.platform_pct < Decimal::ZERO
        {
            return Err(Error::Config(
                "split percentages must not be negative".to_string(),
            ));
        }
        let sum = self.seller_pct + self.courier_pct + self.platform_pct;
        if sum != Decimal::ONE {
            return Err(Error::Config(format!(
                "split percentages must sum to 1, got {}",
                sum
            )));
        }
        Ok(())
    }
}
