//! Property-based tests for the balance calculator.
//!
//! Balance invariant: `current = initial + Σ signed(movement)` and the summary
//! reports no drift exactly when that holds.

use chrono::Utc;
use proptest::prelude::*;

use crate::money::Money;
use crate::summary::Summary;
use crate::types::{Movement, MovementType, PaymentMethod, Register, RegisterStatus};

fn movement_type_strategy() -> impl Strategy<Value = MovementType> {
    prop_oneof![
        Just(MovementType::Income),
        Just(MovementType::Expense),
        Just(MovementType::Sale),
        Just(MovementType::Refund),
        Just(MovementType::Withdrawal),
        Just(MovementType::Deposit),
        Just(MovementType::Adjustment),
    ]
}

fn payment_method_strategy() -> impl Strategy<Value = PaymentMethod> {
    prop_oneof![
        Just(PaymentMethod::Cash),
        Just(PaymentMethod::Card),
        Just(PaymentMethod::Transfer),
        Just(PaymentMethod::App),
        Just(PaymentMethod::Other),
    ]
}

/// A caller request: any sign, normalized the way the ledger does it.
fn history_strategy() -> impl Strategy<Value = Vec<(MovementType, i64, PaymentMethod)>> {
    prop::collection::vec(
        (
            movement_type_strategy(),
            -1_000_000i64..1_000_000i64,
            payment_method_strategy(),
        ),
        0..40,
    )
}

fn build(initial: i64, requests: &[(MovementType, i64, PaymentMethod)]) -> (Register, Vec<Movement>) {
    let now = Utc::now();
    let mut current = Money::from_cents(initial);
    let mut movements = Vec::with_capacity(requests.len());

    for (i, (t, raw, method)) in requests.iter().enumerate() {
        let stored = t.normalize_amount(Money::from_cents(*raw));
        current += t.balance_delta(stored);
        movements.push(Movement {
            id: format!("mv-{i}"),
            tenant_id: "t".to_string(),
            branch_id: "b".to_string(),
            register_id: "reg".to_string(),
            sequence: i as i64 + 1,
            movement_type: *t,
            amount_cents: stored.cents(),
            payment_method: *method,
            description: String::new(),
            reference: None,
            order_id: None,
            order_number: None,
            created_at: now,
            created_by: "prop".to_string(),
        });
    }

    let register = Register {
        id: "reg".to_string(),
        tenant_id: "t".to_string(),
        branch_id: "b".to_string(),
        name: "Prop".to_string(),
        status: RegisterStatus::Open,
        initial_balance_cents: initial,
        current_balance_cents: current.cents(),
        expected_final_balance_cents: None,
        actual_final_balance_cents: None,
        opened_at: now,
        opened_by: "prop".to_string(),
        closed_at: None,
        closed_by: None,
        notes: None,
        updated_at: now,
    };
    (register, movements)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A ledger maintained by appends never drifts.
    #[test]
    fn prop_incremental_balance_matches_history(
        initial in 0i64..10_000_000i64,
        requests in history_strategy(),
    ) {
        let (register, movements) = build(initial, &requests);
        let s = Summary::from_history(&register, &movements).unwrap();

        prop_assert!(s.is_consistent());
        prop_assert_eq!(s.derived_balance, register.current_balance());
        prop_assert_eq!(s.movement_count, movements.len() as i64);
    }

    /// Non-adjustment amounts are stored as magnitudes.
    #[test]
    fn prop_stored_amounts_non_negative_except_adjustments(
        requests in history_strategy(),
    ) {
        let (_, movements) = build(0, &requests);
        for m in movements.iter().filter(|m| m.movement_type != MovementType::Adjustment) {
            prop_assert!(m.amount_cents >= 0);
        }
    }

    /// difference = actual − expected, and adjustments alone explain it.
    #[test]
    fn prop_difference_equals_net_adjustments(
        initial in 0i64..10_000_000i64,
        requests in history_strategy(),
    ) {
        let (register, movements) = build(initial, &requests);
        let s = Summary::from_history(&register, &movements).unwrap();

        prop_assert_eq!(s.difference, s.actual_balance - s.expected_balance);
        prop_assert_eq!(s.difference, s.net_adjustments);
        prop_assert!(s.total_adjustments >= s.net_adjustments.abs());
    }

    /// Payment totals cover exactly the inflow types.
    #[test]
    fn prop_payment_totals_sum_to_inflows(
        requests in history_strategy(),
    ) {
        let (register, movements) = build(0, &requests);
        let s = Summary::from_history(&register, &movements).unwrap();

        prop_assert_eq!(
            s.payment_method_totals.total(),
            s.total_income + s.total_sales + s.total_deposits
        );
    }

    /// Shuffling the history does not change the summary.
    #[test]
    fn prop_order_independent(
        initial in 0i64..1_000_000i64,
        requests in history_strategy(),
    ) {
        let (register, movements) = build(initial, &requests);
        let forward = Summary::from_history(&register, &movements).unwrap();
        let backward = Summary::from_history(&register, movements.iter().rev()).unwrap();

        prop_assert_eq!(forward.expected_balance, backward.expected_balance);
        prop_assert_eq!(forward.payment_method_totals, backward.payment_method_totals);
        prop_assert_eq!(forward.net_adjustments, backward.net_adjustments);
    }

    /// A tampered balance is reported as drift of exactly the tamper amount.
    #[test]
    fn prop_tampering_detected(
        initial in 0i64..1_000_000i64,
        requests in history_strategy(),
        tamper in prop_oneof![-100_000i64..-1i64, 1i64..100_000i64],
    ) {
        let (mut register, movements) = build(initial, &requests);
        register.current_balance_cents += tamper;
        let s = Summary::from_history(&register, &movements).unwrap();

        prop_assert!(!s.is_consistent());
        prop_assert_eq!(s.drift.cents(), tamper);
    }
}
