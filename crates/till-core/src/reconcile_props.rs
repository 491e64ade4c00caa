//! Property-based tests for audit evaluation and the denomination sum law.

use proptest::prelude::*;
use std::collections::BTreeMap;

use crate::denomination::DenominationInput;
use crate::error::ValidationError;
use crate::money::Money;
use crate::reconcile::CashCount;
use crate::types::AuditStatus;

fn face_values() -> impl Strategy<Value = i64> {
    prop_oneof![
        Just(1i64),
        Just(5),
        Just(10),
        Just(25),
        Just(100),
        Just(500),
        Just(1_000),
        Just(2_000),
        Just(5_000),
        Just(10_000),
    ]
}

fn group_strategy() -> impl Strategy<Value = BTreeMap<i64, Option<i64>>> {
    prop::collection::btree_map(face_values(), prop::option::of(-5i64..200i64), 0..8)
}

fn input_strategy() -> impl Strategy<Value = DenominationInput> {
    (group_strategy(), group_strategy()).prop_map(|(bills, coins)| DenominationInput { bills, coins })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Status follows the sign of the difference.
    #[test]
    fn prop_classification_matches_sign(
        expected in -10_000_000i64..10_000_000i64,
        actual in 0i64..10_000_000i64,
    ) {
        let evaluated = CashCount::quick(Money::from_cents(actual))
            .unwrap()
            .evaluate(Money::from_cents(expected));

        prop_assert_eq!(evaluated.difference().cents(), actual - expected);
        let status = evaluated.status();
        match (actual - expected).signum() {
            0 => prop_assert_eq!(status, AuditStatus::Balanced),
            1 => prop_assert_eq!(status, AuditStatus::Surplus),
            _ => prop_assert_eq!(status, AuditStatus::Shortage),
        }
        prop_assert_eq!(evaluated.needs_adjustment(), actual != expected);
    }

    /// Sanitized counts are never negative and never include blank entries.
    #[test]
    fn prop_sanitized_counts_non_negative(input in input_strategy()) {
        let blanks = input.bills.values().chain(input.coins.values()).filter(|c| c.is_none()).count();
        let entries = input.bills.len() + input.coins.len();

        let d = input.sanitize().unwrap();
        prop_assert!(d.bills.values().chain(d.coins.values()).all(|c| *c >= 0));
        prop_assert_eq!(d.bills.len() + d.coins.len(), entries - blanks);
        prop_assert!(!d.total().is_negative());
    }

    /// A count that states its breakdown total passes strict mode.
    #[test]
    fn prop_sum_law_holds_when_total_matches(input in input_strategy()) {
        let total = input.clone().sanitize().unwrap().total();
        let count = CashCount::detailed(total, input).unwrap();

        prop_assert_eq!(count.denomination_gap(), None);
        prop_assert!(count.check_denominations(true).is_ok());
    }

    /// Any disagreement fails strict mode and is tolerated otherwise.
    #[test]
    fn prop_sum_law_violation_flagged(
        input in input_strategy(),
        offset in prop_oneof![-500i64..-1i64, 1i64..500i64],
    ) {
        let total = input.clone().sanitize().unwrap().total();
        let asserted = (total + Money::from_cents(offset)).abs();
        prop_assume!(asserted != total);

        let count = CashCount::detailed(asserted, input).unwrap();
        prop_assert_eq!(count.denomination_gap(), Some(total - asserted));
        prop_assert!(count.check_denominations(false).is_ok());
        let is_mismatch = matches!(
            count.check_denominations(true),
            Err(ValidationError::DenominationMismatch { .. })
        );
        prop_assert!(is_mismatch);
    }
}
