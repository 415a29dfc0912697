//! Property-based tests for the revenue split
//!
//! The split must conserve money exactly under every total, fee and
//! percentage configuration: shares sum to the order total, nothing goes
//! negative, and the courier always keeps the full shipping fee.

use proptest::prelude::*;
use rust_decimal::Decimal;
use settlement::{Error, RevenueSplit, SplitConfig};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Shares always reconcile against the order total to the paisa
    #[test]
    fn prop_shares_conserve_total(
        total_cents in 100i64..10_000_000,
        fee_pct in 0i64..=100,
        courier_assigned in any::<bool>(),
    ) {
        let total = Decimal::new(total_cents, 2);
        let fee = (total * Decimal::new(fee_pct, 2)).round_dp(2);

        let split =
            RevenueSplit::compute(total, fee, courier_assigned, &SplitConfig::default()).unwrap();

        prop_assert_eq!(split.total(), total);
        prop_assert!(split.seller >= Decimal::ZERO);
        prop_assert!(split.courier >= Decimal::ZERO);
        prop_assert!(split.platform >= Decimal::ZERO);

        if courier_assigned {
            // The shipping fee belongs to the courier in full
            prop_assert!(split.courier >= fee);
        } else {
            prop_assert_eq!(split.courier, Decimal::ZERO);
        }
    }

    /// Any whole-percent configuration either splits exactly or refuses;
    /// a split never mints or loses money
    #[test]
    fn prop_custom_splits_conserve_or_refuse(
        total_cents in 100i64..1_000_000,
        fee_cents in 0i64..10_000,
        seller_pct in 0i64..=100,
        courier_cut in 0i64..=100,
    ) {
        let courier_pct = (100 - seller_pct) * courier_cut / 100;
        let platform_pct = 100 - seller_pct - courier_pct;
        let config = SplitConfig::new(
            Decimal::new(seller_pct, 2),
            Decimal::new(courier_pct, 2),
            Decimal::new(platform_pct, 2),
        )
        .unwrap();

        let total = Decimal::new(total_cents, 2);
        let fee = Decimal::new(fee_cents, 2).min(total);

        match RevenueSplit::compute(total, fee, true, &config) {
            Ok(split) => {
                prop_assert_eq!(split.total(), total);
                prop_assert!(split.seller >= Decimal::ZERO);
                prop_assert!(split.courier >= Decimal::ZERO);
                prop_assert!(split.platform >= Decimal::ZERO);
            }
            // Degenerate configurations may round a share negative; the
            // engine refuses those instead of writing a negative credit
            Err(Error::Split(_)) => {}
            Err(other) => return Err(TestCaseError::fail(format!("unexpected error: {other}"))),
        }
    }
}
