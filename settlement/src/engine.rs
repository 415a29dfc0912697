//! Distribution engine
//!
//! Loads a delivered-and-paid order, computes the revenue split and
//! submits the share credits to the wallet ledger as one atomic
//! settlement. The ledger holds the idempotency guard, so concurrent or
//! repeated triggers for the same order settle exactly once.

use crate::{config::Config, split::RevenueSplit, Error, Result};
use order_core::Orders;
use rust_decimal::Decimal;
use std::sync::Arc;
use wallet_ledger::{RevenueCategory, SettlementOutcome, ShareCredit, WalletLedger};

/// Revenue distribution engine
pub struct SettlementEngine {
    /// Order store
    orders: Arc<Orders>,

    /// Wallet ledger receiving the share credits
    ledger: Arc<WalletLedger>,

    /// Configuration
    config: Config,
}

impl SettlementEngine {
    /// Create a distribution engine over an order store and a ledger
    pub fn new(orders: Arc<Orders>, ledger: Arc<WalletLedger>, config: Config) -> Result<Self> {
        config.split.validate()?;
        Ok(Self {
            orders,
            ledger,
            config,
        })
    }

    /// Distribute one order's revenue to seller, courier and platform
    ///
    /// Only delivered-and-paid orders are eligible. The shares commit
    /// atomically; calling this again for the same order returns
    /// [`SettlementOutcome::AlreadyDistributed`] and moves nothing.
    pub async fn distribute(&self, order_number: &str) -> Result<Distribution> {
        let order = self.orders.get(order_number)?;

        if !order.is_settlement_ready() {
            return Err(Error::NotEligible(format!(
                "order {} is {:?}/{:?}, needs delivered/paid",
                order_number, order.status, order.payment_status
            )));
        }

        let split = RevenueSplit::compute(
            order.total_amount,
            order.shipping_fee,
            order.courier.is_some(),
            &self.config.split,
        )?;

        let mut shares = Vec::with_capacity(3);
        if split.seller > Decimal::ZERO {
            shares.push(ShareCredit {
                owner: order.seller.clone(),
                amount: split.seller,
                category: RevenueCategory::SellerShare,
                description: format!("Seller share for order {}", order_number),
            });
        }
        if split.courier > Decimal::ZERO {
            if let Some(courier) = &order.courier {
                shares.push(ShareCredit {
                    owner: courier.clone(),
                    amount: split.courier,
                    category: RevenueCategory::CourierShare,
                    description: format!("Delivery earnings for order {}", order_number),
                });
            }
        }
        if split.platform > Decimal::ZERO {
            shares.push(ShareCredit {
                owner: self.config.platform_account.clone(),
                amount: split.platform,
                category: RevenueCategory::PlatformShare,
                description: format!("Platform commission for order {}", order_number),
            });
        }

        let outcome = self.ledger.apply_settlement(order_number, shares).await?;

        match &outcome {
            SettlementOutcome::Applied { transactions } => {
                tracing::info!(
                    order_number = %order_number,
                    seller = %split.seller,
                    courier = %split.courier,
                    platform = %split.platform,
                    credits = transactions.len(),
                    "Revenue distributed"
                );
            }
            SettlementOutcome::AlreadyDistributed => {
                tracing::debug!(
                    order_number = %order_number,
                    "Revenue already distributed, nothing written"
                );
            }
        }

        Ok(Distribution {
            order_number: order_number.to_string(),
            split,
            outcome,
        })
    }
}

/// Result of a distribution run for one order
#[derive(Debug, Clone)]
pub struct Distribution {
    /// The order settled
    pub order_number: String,

    /// The computed split
    pub split: RevenueSplit,

    /// Whether this run applied the credits or found them already present
    pub outcome: SettlementOutcome,
}
