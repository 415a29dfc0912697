//! Main wallet ledger orchestration layer
//!
//! This module ties together storage, metrics, and the writer actor into a
//! high-level API for balance mutations and transaction history.
//!
//! # Example
//!
//! ```no_run
//! use wallet_ledger::{Config, WalletLedger};
//!
//! #[tokio::main]
//! async fn main() -> wallet_ledger::Result<()> {
//!     let config = Config::default();
//!     let ledger = WalletLedger::open(config).await?;
//!
//!     let wallet = ledger.wallet(wallet_ledger::UserId::new("seller-1")).await?;
//!     println!("available: {}", wallet.available);
//!
//!     Ok(())
//! }
//! ```

use crate::{
    actor::{spawn_wallet_actor, WalletHandle},
    storage::StorageStats,
    types::{
        CreditRequest, DebitRequest, Page, SettlementOutcome, ShareCredit, TransactionRecord,
        TransactionStatus, UserId, Wallet,
    },
    Config, Metrics, Result, Storage,
};
use std::sync::Arc;
use uuid::Uuid;

/// Main wallet ledger interface
pub struct WalletLedger {
    /// Actor handle for mutations
    handle: WalletHandle,

    /// Direct storage access (for reads)
    storage: Arc<Storage>,

    /// Metrics collector
    metrics: Metrics,
}

impl WalletLedger {
    /// Open ledger with configuration
    pub async fn open(config: Config) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config)?);
        let metrics = Metrics::new()?;
        let handle = spawn_wallet_actor(storage.clone(), config.currency, metrics.clone());

        tracing::info!(
            service = %config.service_name,
            version = %config.service_version,
            currency = %config.currency,
            "Wallet ledger opened"
        );

        Ok(Self {
            handle,
            storage,
            metrics,
        })
    }

    /// Credit a wallet
    pub async fn credit(&self, request: CreditRequest) -> Result<TransactionRecord> {
        self.handle.credit(request).await
    }

    /// Debit a wallet
    pub async fn debit(&self, request: DebitRequest) -> Result<TransactionRecord> {
        self.handle.debit(request).await
    }

    /// Get a wallet, creating it with zero balances on first access
    pub async fn wallet(&self, owner: UserId) -> Result<Wallet> {
        self.handle.get_or_create_wallet(owner).await
    }

    /// Apply an order's revenue distribution atomically
    ///
    /// Idempotent per order: a repeat call returns
    /// [`SettlementOutcome::AlreadyDistributed`] and writes nothing.
    pub async fn apply_settlement(
        &self,
        order_ref: impl Into<String>,
        shares: Vec<ShareCredit>,
    ) -> Result<SettlementOutcome> {
        self.handle.apply_settlement(order_ref.into(), shares).await
    }

    /// Resolve a pending payout-linked transaction
    pub async fn set_transaction_status(
        &self,
        transaction_id: Uuid,
        status: TransactionStatus,
    ) -> Result<TransactionRecord> {
        self.handle.set_transaction_status(transaction_id, status).await
    }

    /// Get transaction by ID
    pub fn transaction(&self, transaction_id: Uuid) -> Result<TransactionRecord> {
        self.storage.get_transaction(transaction_id)
    }

    /// Get an owner's transactions, newest first
    pub fn transactions(&self, owner: &UserId, page: Page) -> Result<Vec<TransactionRecord>> {
        let ids = self.storage.transactions_by_owner(owner)?;

        let mut records = Vec::new();
        for id in ids.into_iter().rev().skip(page.skip).take(page.limit) {
            records.push(self.storage.get_transaction(id)?);
        }

        Ok(records)
    }

    /// Get all transactions referencing an order, in creation order
    pub fn transactions_for_order(&self, order_ref: &str) -> Result<Vec<TransactionRecord>> {
        self.storage.transactions_for_order(order_ref)
    }

    /// Get all transactions linked to a payout, in creation order
    pub fn transactions_for_payout(&self, payout_ref: Uuid) -> Result<Vec<TransactionRecord>> {
        self.storage.transactions_for_payout(payout_ref)
    }

    /// Check whether an order's revenue has already been distributed
    pub fn order_settled(&self, order_ref: &str) -> Result<bool> {
        let records = self.storage.transactions_for_order(order_ref)?;
        Ok(records.iter().any(|r| r.category.is_revenue_share()))
    }

    /// Get storage statistics
    pub fn stats(&self) -> Result<StorageStats> {
        self.storage.get_stats()
    }

    /// Get metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Shutdown ledger
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await
    }
}
