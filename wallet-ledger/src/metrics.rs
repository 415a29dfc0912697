//! Metrics collection for observability
//!
//! This module provides Prometheus metrics for monitoring the wallet ledger.
//!
//! # Metrics
//!
//! - `wallet_credits_total` - Total number of credit entries written
//! - `wallet_debits_total` - Total number of debit entries written
//! - `wallet_settlements_total` - Total number of order distributions applied
//! - `wallet_credited_amount` - Histogram of credited amounts

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Total credit entries written
    pub credits_total: IntCounter,

    /// Total debit entries written
    pub debits_total: IntCounter,

    /// Total order distributions applied
    pub settlements_total: IntCounter,

    /// Credited amount histogram
    pub credited_amount: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let credits_total =
            IntCounter::new("wallet_credits_total", "Total number of credit entries written")?;
        registry.register(Box::new(credits_total.clone()))?;

        let debits_total =
            IntCounter::new("wallet_debits_total", "Total number of debit entries written")?;
        registry.register(Box::new(debits_total.clone()))?;

        let settlements_total = IntCounter::new(
            "wallet_settlements_total",
            "Total number of order distributions applied",
        )?;
        registry.register(Box::new(settlements_total.clone()))?;

        let credited_amount = Histogram::with_opts(
            HistogramOpts::new("wallet_credited_amount", "Histogram of credited amounts").buckets(
                vec![10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0, 10000.0, 50000.0, 100000.0],
            ),
        )?;
        registry.register(Box::new(credited_amount.clone()))?;

        Ok(Self {
            credits_total,
            debits_total,
            settlements_total,
            credited_amount,
            registry,
        })
    }

    /// Record a credit entry
    pub fn record_credit(&self, amount: Decimal) {
        self.credits_total.inc();
        if let Some(v) = amount.to_f64() {
            self.credited_amount.observe(v);
        }
    }

    /// Record a debit entry
    pub fn record_debit(&self) {
        self.debits_total.inc();
    }

    /// Record an applied distribution
    pub fn record_settlement(&self) {
        self.settlements_total.inc();
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        assert_eq!(metrics.credits_total.get(), 0);
        assert_eq!(metrics.debits_total.get(), 0);
    }

    #[test]
    fn test_record_credit() {
        let metrics = Metrics::new().unwrap();
        metrics.record_credit(dec!(100));
        metrics.record_credit(dec!(250.50));
        assert_eq!(metrics.credits_total.get(), 2);
    }

    #[test]
    fn test_record_debit_and_settlement() {
        let metrics = Metrics::new().unwrap();
        metrics.record_debit();
        metrics.record_settlement();
        assert_eq!(metrics.debits_total.get(), 1);
        assert_eq!(metrics.settlements_total.get(), 1);
    }

    #[test]
    fn test_independent_registries() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.record_credit(dec!(10));
        assert_eq!(a.credits_total.get(), 1);
        assert_eq!(b.credits_total.get(), 0);
    }
}
