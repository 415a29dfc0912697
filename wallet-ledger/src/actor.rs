//! Actor-based concurrency for the wallet ledger
//!
//! This module implements the single-writer pattern using Tokio actors:
//! - One logical writer task eliminates read-modify-write races on balances
//! - Every mutation is applied and durable before its reply is sent, so a
//!   caller that observed a debit can rely on later messages seeing it
//! - Async message passing with backpressure
//!
//! Reads that tolerate a point-in-time view (wallet lookups, transaction
//! listings) go straight to storage and never enter the mailbox.

use crate::types::{
    CreditRequest, DebitRequest, EntryKind, SettlementOutcome, ShareCredit, TransactionRecord,
    TransactionStatus, UserId, Wallet,
};
use crate::{Currency, Error, Metrics, Result, Storage};
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Message sent to the wallet actor
pub enum WalletMessage {
    /// Credit a wallet
    Credit {
        request: CreditRequest,
        response: oneshot::Sender<Result<TransactionRecord>>,
    },

    /// Debit a wallet
    Debit {
        request: DebitRequest,
        response: oneshot::Sender<Result<TransactionRecord>>,
    },

    /// Get a wallet, creating it with zero balances if absent
    GetOrCreateWallet {
        owner: UserId,
        response: oneshot::Sender<Result<Wallet>>,
    },

    /// Apply an order's revenue distribution atomically
    ApplySettlement {
        order_ref: String,
        shares: Vec<ShareCredit>,
        response: oneshot::Sender<Result<SettlementOutcome>>,
    },

    /// Resolve a pending payout-linked transaction
    SetTransactionStatus {
        transaction_id: Uuid,
        status: TransactionStatus,
        response: oneshot::Sender<Result<TransactionRecord>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes wallet mutations
pub struct WalletActor {
    /// Storage backend
    storage: Arc<Storage>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<WalletMessage>,

    /// Currency new wallets are opened in
    currency: Currency,

    /// Metrics collector
    metrics: Metrics,
}

impl WalletActor {
    /// Create new actor
    pub fn new(
        storage: Arc<Storage>,
        mailbox: mpsc::Receiver<WalletMessage>,
        currency: Currency,
        metrics: Metrics,
    ) -> Self {
        Self {
            storage,
            mailbox,
            currency,
            metrics,
        }
    }

    /// Run the actor event loop
    ///
    /// Each message is fully applied (validate, mutate, commit) before the
    /// next one is taken from the mailbox.
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                WalletMessage::Credit { request, response } => {
                    let _ = response.send(self.handle_credit(request));
                }

                WalletMessage::Debit { request, response } => {
                    let _ = response.send(self.handle_debit(request));
                }

                WalletMessage::GetOrCreateWallet { owner, response } => {
                    let _ = response.send(self.handle_get_or_create(owner));
                }

                WalletMessage::ApplySettlement {
                    order_ref,
                    shares,
                    response,
                } => {
                    let _ = response.send(self.handle_apply_settlement(order_ref, shares));
                }

                WalletMessage::SetTransactionStatus {
                    transaction_id,
                    status,
                    response,
                } => {
                    let _ = response.send(self.handle_set_transaction_status(transaction_id, status));
                }

                WalletMessage::Shutdown => break,
            }
        }

        tracing::info!("Wallet actor stopped");
    }

    fn handle_credit(&self, request: CreditRequest) -> Result<TransactionRecord> {
        validate_amount(request.amount)?;

        // Idempotency guard: a payout-linked credit is its refund, and a
        // payout refunds at most once. A resolution retried after a partial
        // failure gets the refund that already exists.
        if let Some(payout_ref) = request.payout_ref {
            let existing = self.storage.transactions_for_payout(payout_ref)?;
            if let Some(refund) = existing.into_iter().find(|t| t.kind == EntryKind::Credit) {
                tracing::info!(payout_ref = %payout_ref, "Refund already issued, skipping");
                return Ok(refund);
            }
        }

        let mut wallet = self.load_or_new(&request.owner)?;
        let balance_before = wallet.available;
        wallet.available += request.amount;
        wallet.total_earned += request.amount;
        wallet.updated_at = Utc::now();

        let record = TransactionRecord {
            transaction_id: Uuid::now_v7(),
            owner: request.owner,
            order_ref: request.order_ref,
            payout_ref: request.payout_ref,
            kind: EntryKind::Credit,
            amount: request.amount,
            currency: wallet.currency,
            category: request.category,
            balance_before,
            balance_after: wallet.available,
            status: TransactionStatus::Completed,
            description: request.description,
            created_at: wallet.updated_at,
        };

        self.storage
            .commit(std::slice::from_ref(&wallet), std::slice::from_ref(&record))?;
        self.metrics.record_credit(record.amount);

        tracing::debug!(
            owner = %record.owner,
            amount = %record.amount,
            category = ?record.category,
            "Wallet credited"
        );

        Ok(record)
    }

    fn handle_debit(&self, request: DebitRequest) -> Result<TransactionRecord> {
        validate_amount(request.amount)?;

        let mut wallet = self.load_or_new(&request.owner)?;
        if request.amount > wallet.available {
            return Err(Error::InsufficientBalance {
                requested: request.amount,
                available: wallet.available,
            });
        }

        let balance_before = wallet.available;
        wallet.available -= request.amount;
        wallet.total_withdrawn += request.amount;
        wallet.updated_at = Utc::now();

        // A debit tied to an in-flight payout stays pending until the
        // payout resolves.
        let status = if request.payout_ref.is_some() {
            TransactionStatus::Pending
        } else {
            TransactionStatus::Completed
        };

        let record = TransactionRecord {
            transaction_id: Uuid::now_v7(),
            owner: request.owner,
            order_ref: request.order_ref,
            payout_ref: request.payout_ref,
            kind: EntryKind::Debit,
            amount: request.amount,
            currency: wallet.currency,
            category: request.category,
            balance_before,
            balance_after: wallet.available,
            status,
            description: request.description,
            created_at: wallet.updated_at,
        };

        self.storage
            .commit(std::slice::from_ref(&wallet), std::slice::from_ref(&record))?;
        self.metrics.record_debit();

        tracing::debug!(
            owner = %record.owner,
            amount = %record.amount,
            status = ?record.status,
            "Wallet debited"
        );

        Ok(record)
    }

    fn handle_get_or_create(&self, owner: UserId) -> Result<Wallet> {
        if let Some(wallet) = self.storage.get_wallet(&owner)? {
            return Ok(wallet);
        }

        let wallet = Wallet::new(owner, self.currency);
        self.storage.put_wallet(&wallet)?;

        tracing::debug!(owner = %wallet.owner, "Wallet created");

        Ok(wallet)
    }

    /// Apply all share credits of one order in a single WriteBatch
    ///
    /// Shares must carry revenue share categories; the idempotency check
    /// keys on them. A wallet appearing in several shares is staged once
    /// and accumulates, so the committed state is the sum of its shares.
    fn handle_apply_settlement(
        &self,
        order_ref: String,
        shares: Vec<ShareCredit>,
    ) -> Result<SettlementOutcome> {
        // Idempotency guard: an earlier distribution left revenue share
        // transactions behind, so this call must write nothing.
        let existing = self.storage.transactions_for_order(&order_ref)?;
        if existing.iter().any(|t| t.category.is_revenue_share()) {
            tracing::info!(order_ref = %order_ref, "Distribution already applied, skipping");
            return Ok(SettlementOutcome::AlreadyDistributed);
        }

        let now = Utc::now();
        let mut wallets: BTreeMap<UserId, Wallet> = BTreeMap::new();
        let mut records = Vec::with_capacity(shares.len());

        for share in shares {
            validate_amount(share.amount)?;

            let wallet = match wallets.entry(share.owner.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let wallet = self.load_or_new(entry.key())?;
                    entry.insert(wallet)
                }
            };

            let balance_before = wallet.available;
            wallet.available += share.amount;
            wallet.total_earned += share.amount;
            wallet.updated_at = now;

            records.push(TransactionRecord {
                transaction_id: Uuid::now_v7(),
                owner: share.owner,
                order_ref: Some(order_ref.clone()),
                payout_ref: None,
                kind: EntryKind::Credit,
                amount: share.amount,
                currency: wallet.currency,
                category: share.category,
                balance_before,
                balance_after: wallet.available,
                status: TransactionStatus::Completed,
                description: share.description,
                created_at: now,
            });
        }

        let wallets: Vec<Wallet> = wallets.into_values().collect();
        self.storage.commit(&wallets, &records)?;

        self.metrics.record_settlement();
        for record in &records {
            self.metrics.record_credit(record.amount);
        }

        tracing::info!(
            order_ref = %order_ref,
            credits = records.len(),
            "Distribution applied"
        );

        Ok(SettlementOutcome::Applied {
            transactions: records,
        })
    }

    fn handle_set_transaction_status(
        &self,
        transaction_id: Uuid,
        status: TransactionStatus,
    ) -> Result<TransactionRecord> {
        let mut record = self.storage.get_transaction(transaction_id)?;

        if record.status != TransactionStatus::Pending {
            return Err(Error::InvalidTransition(format!(
                "transaction {} is {:?}, only pending records can be resolved",
                transaction_id, record.status
            )));
        }
        if !matches!(
            status,
            TransactionStatus::Completed | TransactionStatus::Cancelled
        ) {
            return Err(Error::InvalidTransition(format!(
                "pending records resolve to completed or cancelled, not {:?}",
                status
            )));
        }

        record.status = status;
        self.storage.update_transaction(&record)?;

        tracing::debug!(
            transaction_id = %transaction_id,
            status = ?status,
            "Transaction resolved"
        );

        Ok(record)
    }

    fn load_or_new(&self, owner: &UserId) -> Result<Wallet> {
        Ok(match self.storage.get_wallet(owner)? {
            Some(wallet) => wallet,
            None => Wallet::new(owner.clone(), self.currency),
        })
    }
}

fn validate_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(Error::InvalidAmount(format!(
            "amount must be positive, got {}",
            amount
        )));
    }
    Ok(())
}

/// Handle for sending messages to the actor
#[derive(Clone)]
pub struct WalletHandle {
    sender: mpsc::Sender<WalletMessage>,
}

impl WalletHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<WalletMessage>) -> Self {
        Self { sender }
    }

    /// Credit a wallet
    pub async fn credit(&self, request: CreditRequest) -> Result<TransactionRecord> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(WalletMessage::Credit {
                request,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Debit a wallet
    pub async fn debit(&self, request: DebitRequest) -> Result<TransactionRecord> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(WalletMessage::Debit {
                request,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Get or create a wallet
    pub async fn get_or_create_wallet(&self, owner: UserId) -> Result<Wallet> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(WalletMessage::GetOrCreateWallet {
                owner,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Apply an order's revenue distribution
    pub async fn apply_settlement(
        &self,
        order_ref: String,
        shares: Vec<ShareCredit>,
    ) -> Result<SettlementOutcome> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(WalletMessage::ApplySettlement {
                order_ref,
                shares,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Resolve a pending payout-linked transaction
    pub async fn set_transaction_status(
        &self,
        transaction_id: Uuid,
        status: TransactionStatus,
    ) -> Result<TransactionRecord> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(WalletMessage::SetTransactionStatus {
                transaction_id,
                status,
                response: tx,
            })
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;

        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.sender
            .send(WalletMessage::Shutdown)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))?;
        Ok(())
    }
}

/// Spawn the wallet actor
pub fn spawn_wallet_actor(
    storage: Arc<Storage>,
    currency: Currency,
    metrics: Metrics,
) -> WalletHandle {
    let (tx, rx) = mpsc::channel(1000); // Bounded channel for backpressure
    let actor = WalletActor::new(storage, rx, currency, metrics);

    tokio::spawn(async move {
        actor.run().await;
    });

    WalletHandle::new(tx)
}
