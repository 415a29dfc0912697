//! Revenue split computation
//!
//! Splits a delivered-and-paid order total between seller, courier and
//! platform. Percentages apply to the base net of the shipping fee; the
//! shipping fee goes to the courier in full on top of their share.
//!
//! # Example
//!
//! ```text
//! Order total:   1000.00, shipping fee 50.00
//! Base:           950.00 (total − fee)
//!
//! Seller   (80%): 760.00
//! Courier  (10%):  95.00 + 50.00 fee = 145.00
//! Platform (10%):  95.00
//!
//! Sum: 760 + 145 + 95 = 1000.00 (always exact)
//! ```
//!
//! Each share rounds half-away-from-zero to 2 decimal places
//! independently, so the three can drift from the total by a few hundredth
//! units. The platform share absorbs that residual, which keeps the sum
//! exactly equal to the order total without touching seller or courier
//! money. Orders that never had a courier fold the whole courier share,
//! fee included, into the platform share.

use crate::{config::SplitConfig, Error, Result};
use rust_decimal::{Decimal, RoundingStrategy};

/// One order's revenue split, summing exactly to the order total
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevenueSplit {
    /// Seller share
    pub seller: Decimal,

    /// Courier share including the full shipping fee, zero if no courier
    pub courier: Decimal,

    /// Platform share including any rounding residual
    pub platform: Decimal,
}

impl RevenueSplit {
    /// Compute the split for an order
    ///
    /// `courier_assigned` decides whether the courier share is paid out or
    /// folded into the platform share. Fails if the shipping fee exceeds
    /// the total; a split must never mint money.
    pub fn compute(
        total_amount: Decimal,
        shipping_fee: Decimal,
        courier_assigned: bool,
        config: &SplitConfig,
    ) -> Result<Self> {
        let base = total_amount - shipping_fee;
        if base < Decimal::ZERO {
            return Err(Error::Split(format!(
                "shipping fee {} exceeds order total {}",
                shipping_fee, total_amount
            )));
        }

        let seller = round2(base * config.seller_pct);
        let courier_base = round2(base * config.courier_pct);
        let platform_base = round2(base * config.platform_pct);

        let (courier, mut platform) = if courier_assigned {
            (courier_base + shipping_fee, platform_base)
        } else {
            (Decimal::ZERO, platform_base + courier_base + shipping_fee)
        };

        // Rounding drifts at most a few hundredths; the platform absorbs it
        // so the shares reconcile against the order total exactly
        let residual = total_amount - seller - courier - platform;
        platform += residual;

        if seller < Decimal::ZERO || courier < Decimal::ZERO || platform < Decimal::ZERO {
            return Err(Error::Split(format!(
                "split of {} produced a negative share ({}/{}/{})",
                total_amount, seller, courier, platform
            )));
        }

        Ok(Self {
            seller,
            courier,
            platform,
        })
    }

    /// Sum of the three shares (equals the order total by construction)
    pub fn total(&self) -> Decimal {
        self.seller + self.courier + self.platform
    }
}

fn round2(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_standard_split() {
        let split =
            RevenueSplit::compute(dec!(1000), dec!(50), true, &SplitConfig::default()).unwrap();

        assert_eq!(split.seller, dec!(760));
        assert_eq!(split.courier, dec!(145)); // 95 share + 50 fee
        assert_eq!(split.platform, dec!(95));
        assert_eq!(split.total(), dec!(1000));
    }

    #[test]
    fn test_no_courier_folds_into_platform() {
        let split =
            RevenueSplit::compute(dec!(1000), dec!(50), false, &SplitConfig::default()).unwrap();

        assert_eq!(split.seller, dec!(760));
        assert_eq!(split.courier, dec!(0));
        // 95 platform + 95 courier share + 50 fee
        assert_eq!(split.platform, dec!(240));
        assert_eq!(split.total(), dec!(1000));
    }

    #[test]
    fn test_zero_shipping_fee() {
        let split =
            RevenueSplit::compute(dec!(500), dec!(0), true, &SplitConfig::default()).unwrap();

        assert_eq!(split.seller, dec!(400));
        assert_eq!(split.courier, dec!(50));
        assert_eq!(split.platform, dec!(50));
    }

    #[test]
    fn test_platform_absorbs_rounding_residual() {
        let config = SplitConfig::new(dec!(0.70), dec!(0.15), dec!(0.15)).unwrap();

        // base = 0.10: seller 0.07, courier 0.02 (0.015 rounds away from
        // zero), platform 0.02; 0.11 > 0.10, platform gives back 0.01
        let split = RevenueSplit::compute(dec!(0.10), dec!(0), true, &config).unwrap();
        assert_eq!(split.seller, dec!(0.07));
        assert_eq!(split.courier, dec!(0.02));
        assert_eq!(split.platform, dec!(0.01));
        assert_eq!(split.total(), dec!(0.10));
    }

    #[test]
    fn test_fee_exceeding_total_refused() {
        let err =
            RevenueSplit::compute(dec!(40), dec!(50), true, &SplitConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Split(_)));
    }

    #[test]
    fn test_fee_equal_to_total() {
        // Base of zero: the courier gets the fee, nothing else moves
        let split =
            RevenueSplit::compute(dec!(50), dec!(50), true, &SplitConfig::default()).unwrap();
        assert_eq!(split.seller, dec!(0));
        assert_eq!(split.courier, dec!(50));
        assert_eq!(split.platform, dec!(0));
    }

    #[test]
    fn test_paise_amounts_reconcile() {
        let split =
            RevenueSplit::compute(dec!(333.33), dec!(25.50), true, &SplitConfig::default())
                .unwrap();

        // base 307.83: 246.26 / 30.78 / 30.78, residual +0.01 to platform
        assert_eq!(split.seller, dec!(246.26));
        assert_eq!(split.courier, dec!(56.28));
        assert_eq!(split.platform, dec!(30.79));
        assert_eq!(split.total(), dec!(333.33));
    }
}
