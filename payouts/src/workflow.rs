//! Payout workflow
//!
//! Funds are escrowed the instant a request is filed: the wallet debit
//! happens before the payout record exists, so a request either holds its
//! money or does not exist. Approval moves no funds; rejection and
//! cancellation refund the escrow.
//!
//! Two serialization layers keep resolutions single-shot. Payout record
//! mutations run under the store write lock (never held across an await).
//! The escrowed debit's status flip goes through the ledger actor, which
//! accepts exactly one `Pending -> Completed|Cancelled` move. The ledger
//! issues at most one refund credit per payout, so a resolution that died
//! between releasing the escrow and refunding it can be retried; of two
//! racing resolutions, the record write under the lock settles which one
//! reports success.

use crate::{
    config::Config,
    error::{Error, Result},
    storage::Storage,
    types::{PayoutMethod, PayoutRequest, PayoutStatus},
};
use chrono::Utc;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;
use wallet_ledger::{
    Actor, CreditRequest, DebitRequest, Page, RevenueCategory, TransactionStatus, UserId,
    WalletLedger,
};

/// Main payout workflow interface
pub struct Payouts {
    /// Storage backend
    storage: Arc<Storage>,

    /// Wallet ledger holding the escrowed funds
    ledger: Arc<WalletLedger>,

    /// Serializes payout record mutations
    write_lock: Mutex<()>,

    /// Configuration
    config: Config,
}

impl Payouts {
    /// Open the payout store against a wallet ledger
    pub fn open(config: Config, ledger: Arc<WalletLedger>) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config)?);

        tracing::info!(min_amount = %config.min_amount, "Payout store opened");

        Ok(Self {
            storage,
            ledger,
            write_lock: Mutex::new(()),
            config,
        })
    }

    /// File a payout request, escrowing the amount immediately
    ///
    /// The wallet debit is the commit point: an insufficient balance fails
    /// here and no request is recorded.
    pub async fn request(
        &self,
        user: UserId,
        amount: Decimal,
        method: PayoutMethod,
    ) -> Result<PayoutRequest> {
        if amount < self.config.min_amount {
            return Err(Error::Validation(format!(
                "minimum payout is {}, got {}",
                self.config.min_amount, amount
            )));
        }
        method.validate()?;

        let payout_id = Uuid::now_v7();

        // Escrow: the debit stays Pending until the payout resolves
        let debit = self
            .ledger
            .debit(DebitRequest {
                owner: user.clone(),
                amount,
                category: RevenueCategory::Payout,
                description: format!("Payout request {}", payout_id),
                order_ref: None,
                payout_ref: Some(payout_id),
            })
            .await?;

        let payout = PayoutRequest {
            payout_id,
            user,
            amount,
            method,
            status: PayoutStatus::Pending,
            requested_at: Utc::now(),
            processed_at: None,
            processed_by: None,
            failure_reason: None,
            settlement_reference: None,
            debit_transaction_id: debit.transaction_id,
        };

        {
            let _guard = self.write_lock.lock();
            self.storage.commit(&payout, None)?;
        }

        tracing::info!(
            payout_id = %payout_id,
            user = %payout.user,
            amount = %amount,
            "Payout requested, funds escrowed"
        );

        Ok(payout)
    }

    /// Approve a payout (admin only)
    ///
    /// Legal from `Pending` or `Processing`; the `Processing` intermediate
    /// is written first so a half-finished approval can be retried. No
    /// funds move, the escrow was taken at request time.
    pub async fn approve(
        &self,
        payout_id: Uuid,
        admin: &Actor,
        settlement_reference: Option<String>,
    ) -> Result<PayoutRequest> {
        if !admin.is_admin() {
            return Err(Error::Forbidden(format!("{} is not an admin", admin.user)));
        }

        let debit_transaction_id = {
            let _guard = self.write_lock.lock();
            let mut payout = self.storage.get_payout(payout_id)?;
            self.require_resolvable(&payout)?;

            if payout.status == PayoutStatus::Pending {
                payout.status = PayoutStatus::Processing;
                self.storage.commit(&payout, Some(PayoutStatus::Pending))?;
            }
            payout.debit_transaction_id
        };

        // The flip arbitrates racing resolutions; exactly one succeeds
        match self
            .ledger
            .set_transaction_status(debit_transaction_id, TransactionStatus::Completed)
            .await
        {
            Ok(_) => {}
            Err(wallet_ledger::Error::InvalidTransition(_)) => {
                // A completed debit means an earlier approval already won
                // the flip (it may have stopped short of the final write);
                // finishing it is safe because approval moves no funds.
                let debit = self.ledger.transaction(debit_transaction_id)?;
                if debit.status != TransactionStatus::Completed {
                    return Err(Error::InvalidTransition(format!(
                        "payout {} was already resolved",
                        payout_id
                    )));
                }
            }
            Err(e) => return Err(e.into()),
        }

        let reference = settlement_reference
            .unwrap_or_else(|| format!("manual-{}", payout_id.simple()));

        let payout = {
            let _guard = self.write_lock.lock();
            let mut payout = self.storage.get_payout(payout_id)?;
            self.require_resolvable(&payout)?;

            let previous = payout.status;
            payout.status = PayoutStatus::Completed;
            payout.settlement_reference = Some(reference);
            payout.processed_by = Some(admin.user.clone());
            payout.processed_at = Some(Utc::now());
            self.storage.commit(&payout, Some(previous))?;
            payout
        };

        tracing::info!(
            payout_id = %payout_id,
            admin = %admin.user,
            reference = ?payout.settlement_reference,
            "Payout approved"
        );

        Ok(payout)
    }

    /// Reject a payout and refund the escrow (admin only)
    pub async fn reject(
        &self,
        payout_id: Uuid,
        admin: &Actor,
        reason: impl Into<String>,
    ) -> Result<PayoutRequest> {
        if !admin.is_admin() {
            return Err(Error::Forbidden(format!("{} is not an admin", admin.user)));
        }

        let (debit_transaction_id, user, amount) = {
            let _guard = self.write_lock.lock();
            let payout = self.storage.get_payout(payout_id)?;
            self.require_resolvable(&payout)?;
            (payout.debit_transaction_id, payout.user, payout.amount)
        };

        self.release_escrow(payout_id, debit_transaction_id).await?;

        // The escrow is released; the ledger issues this refund at most once
        self.ledger
            .credit(CreditRequest {
                owner: user,
                amount,
                category: RevenueCategory::Payout,
                description: format!("Refund for rejected payout {}", payout_id),
                order_ref: None,
                payout_ref: Some(payout_id),
            })
            .await?;

        let reason = reason.into();
        let payout = {
            let _guard = self.write_lock.lock();
            let mut payout = self.storage.get_payout(payout_id)?;
            self.require_resolvable(&payout)?;
            let previous = payout.status;
            payout.status = PayoutStatus::Failed;
            payout.failure_reason = Some(reason);
            payout.processed_by = Some(admin.user.clone());
            payout.processed_at = Some(Utc::now());
            self.storage.commit(&payout, Some(previous))?;
            payout
        };

        tracing::info!(
            payout_id = %payout_id,
            admin = %admin.user,
            reason = ?payout.failure_reason,
            "Payout rejected, escrow refunded"
        );

        Ok(payout)
    }

    /// Cancel a payout and refund the escrow (requester only)
    ///
    /// Only `Pending` requests can be withdrawn; once an admin starts
    /// processing, the requester has to wait for the outcome.
    pub async fn cancel(&self, payout_id: Uuid, requester: &UserId) -> Result<PayoutRequest> {
        let (debit_transaction_id, amount) = {
            let _guard = self.write_lock.lock();
            let payout = self.storage.get_payout(payout_id)?;

            if payout.user != *requester {
                return Err(Error::Forbidden(format!(
                    "{} did not request payout {}",
                    requester, payout_id
                )));
            }
            if payout.status != PayoutStatus::Pending {
                return Err(Error::InvalidTransition(format!(
                    "payout {} is {:?}, only pending requests can be cancelled",
                    payout_id, payout.status
                )));
            }
            (payout.debit_transaction_id, payout.amount)
        };

        self.release_escrow(payout_id, debit_transaction_id).await?;

        self.ledger
            .credit(CreditRequest {
                owner: requester.clone(),
                amount,
                category: RevenueCategory::Payout,
                description: format!("Refund for cancelled payout {}", payout_id),
                order_ref: None,
                payout_ref: Some(payout_id),
            })
            .await?;

        let payout = {
            let _guard = self.write_lock.lock();
            let mut payout = self.storage.get_payout(payout_id)?;
            if payout.status != PayoutStatus::Pending {
                return Err(Error::InvalidTransition(format!(
                    "payout {} is {:?}, only pending requests can be cancelled",
                    payout_id, payout.status
                )));
            }
            let previous = payout.status;
            payout.status = PayoutStatus::Cancelled;
            payout.processed_at = Some(Utc::now());
            self.storage.commit(&payout, Some(previous))?;
            payout
        };

        tracing::info!(
            payout_id = %payout_id,
            user = %requester,
            "Payout cancelled by requester, escrow refunded"
        );

        Ok(payout)
    }

    // Queries

    /// Get payout by ID
    pub fn get(&self, payout_id: Uuid) -> Result<PayoutRequest> {
        self.storage.get_payout(payout_id)
    }

    /// A user's payout requests, newest first
    pub fn list_for_user(&self, user: &UserId, page: Page) -> Result<Vec<PayoutRequest>> {
        let ids = self.storage.payouts_for_user(user)?;
        self.load_page(ids, page)
    }

    /// Payouts currently in a status, newest first (admin review queue)
    pub fn list_by_status(&self, status: PayoutStatus, page: Page) -> Result<Vec<PayoutRequest>> {
        let ids = self.storage.payouts_by_status(status)?;
        self.load_page(ids, page)
    }

    // Internal helpers

    fn load_page(&self, ids: Vec<Uuid>, page: Page) -> Result<Vec<PayoutRequest>> {
        let mut payouts = Vec::new();
        for id in ids.into_iter().rev().skip(page.skip).take(page.limit) {
            payouts.push(self.storage.get_payout(id)?);
        }
        Ok(payouts)
    }

    fn require_resolvable(&self, payout: &PayoutRequest) -> Result<()> {
        if !matches!(
            payout.status,
            PayoutStatus::Pending | PayoutStatus::Processing
        ) {
            return Err(Error::InvalidTransition(format!(
                "payout {} is {:?} and cannot be resolved again",
                payout.payout_id, payout.status
            )));
        }
        Ok(())
    }

    /// Flip the escrow debit to Cancelled, the gate for any refund
    ///
    /// A flip that finds the debit already Cancelled belongs to a resolution
    /// that died between releasing the escrow and refunding it; the caller
    /// proceeds, and the ledger's per-payout refund guard keeps the credit
    /// single.
    async fn release_escrow(&self, payout_id: Uuid, debit_transaction_id: Uuid) -> Result<()> {
        match self
            .ledger
            .set_transaction_status(debit_transaction_id, TransactionStatus::Cancelled)
            .await
        {
            Ok(_) => Ok(()),
            Err(wallet_ledger::Error::InvalidTransition(_)) => {
                let debit = self.ledger.transaction(debit_transaction_id)?;
                if debit.status == TransactionStatus::Cancelled {
                    return Ok(());
                }
                Err(Error::InvalidTransition(format!(
                    "payout {} was already resolved",
                    payout_id
                )))
            }
            Err(e) => Err(e.into()),
        }
    }
}
