//! End-to-end shift scenarios across all engine components.

use std::collections::HashSet;

use till_core::{
    AuditStatus, CloseRegister, Money, MovementType, NewMovement, PaymentMethod, RegisterStatus,
};
use uuid::Uuid;

use crate::testing::{engine, open, scope};
use crate::{AuditRequest, CashEngine, EngineConfig, EngineError};

fn cash(register_id: &str, t: MovementType, cents: i64, description: &str) -> NewMovement {
    NewMovement::new(register_id, t, Money::from_cents(cents), PaymentMethod::Cash, description)
}

#[tokio::test]
async fn test_full_shift() {
    let engine = engine().await;
    let s = scope();

    // A: float of 100.00 and a cash sale of 50.00
    let reg = open(&engine, 10_000).await;
    engine
        .ledger()
        .append(&s, "ana", cash(&reg.id, MovementType::Sale, 5_000, "Sale"))
        .await
        .unwrap();

    let summary = engine.balances().summarize(&s, &reg.id).await.unwrap();
    assert_eq!(summary.expected_balance.cents(), 15_000);
    assert_eq!(summary.payment_method_totals.cash.cents(), 5_000);
    assert_eq!(summary.actual_balance.cents(), 15_000);

    // B: an expense of 20.00
    engine
        .ledger()
        .append(&s, "ana", cash(&reg.id, MovementType::Expense, 2_000, "Napkins"))
        .await
        .unwrap();

    let summary = engine.balances().summarize(&s, &reg.id).await.unwrap();
    assert_eq!(summary.expected_balance.cents(), 13_000);
    assert_eq!(summary.total_expense.cents(), 2_000);
    // expenses never count as inflows
    assert_eq!(summary.payment_method_totals.cash.cents(), 5_000);

    // C: audit of 125.00 against the cash inflows
    let audit = engine
        .audits()
        .perform_audit(&s, "ana", AuditRequest::new(&reg.id, Money::from_cents(12_500)))
        .await
        .unwrap();
    assert_eq!(audit.expected_cash_cents, 5_000);
    assert_eq!(audit.difference_cents, 7_500);
    assert_eq!(audit.status, AuditStatus::Surplus);

    let movements = engine.ledger().list(&s, &reg.id).await.unwrap();
    assert_eq!(movements.len(), 3);
    let adjustment = &movements[0];
    assert_eq!(adjustment.movement_type, MovementType::Adjustment);
    assert_eq!(adjustment.amount_cents, 7_500);
    assert_eq!(adjustment.description, "Audit surplus of $75.00");
    assert_eq!(adjustment.reference.as_deref(), Some(audit.id.as_str()));

    let summary = engine.balances().summarize(&s, &reg.id).await.unwrap();
    assert_eq!(summary.total_adjustments.cents(), 7_500);
    assert_eq!(summary.actual_balance.cents(), 20_500);
    assert!(summary.is_consistent());

    // D: close without a count
    let closed = engine
        .registers()
        .close(&s, &reg.id, "ana", CloseRegister::new())
        .await
        .unwrap();
    assert_eq!(closed.status, RegisterStatus::Closed);
    assert_eq!(closed.expected_final_balance_cents, Some(summary.expected_balance.cents()));

    let err = engine
        .ledger()
        .append(&s, "ana", cash(&reg.id, MovementType::Sale, 100, "Late sale"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::RegisterClosed { .. }));
    assert!(!err.is_retryable());

    // history stays readable after close
    assert_eq!(engine.ledger().list(&s, &reg.id).await.unwrap().len(), 3);
    assert_eq!(engine.audits().list_audits(&s, &reg.id).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_keep_balance() {
    let path = std::env::temp_dir().join(format!("till-stress-{}.db", Uuid::new_v4()));
    let mut config = EngineConfig::default();
    config.database.path = path.clone();
    config.database.max_connections = 5;

    let engine = CashEngine::connect(config).await.unwrap();
    let reg = open(&engine, 10_000).await;

    let mut handles = Vec::new();
    for i in 0..25i64 {
        let engine = engine.clone();
        let register_id = reg.id.clone();
        handles.push(tokio::spawn(async move {
            let (t, cents) = if i % 5 == 0 {
                (MovementType::Withdrawal, 300)
            } else {
                (MovementType::Sale, 100 + i)
            };
            engine
                .ledger()
                .append(&scope(), &format!("cashier-{i}"), cash(&register_id, t, cents, "stress"))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let movements = engine.ledger().list(&scope(), &reg.id).await.unwrap();
    assert_eq!(movements.len(), 25);

    let sequences: HashSet<i64> = movements.iter().map(|m| m.sequence).collect();
    assert_eq!(sequences, (1..=25).collect::<HashSet<_>>());
    assert!(movements.windows(2).all(|w| w[0].created_at >= w[1].created_at));

    let expected: i64 = 10_000 + movements.iter().map(|m| m.balance_delta().cents()).sum::<i64>();
    let register = engine.registers().get(&scope(), &reg.id).await.unwrap();
    assert_eq!(register.current_balance_cents, expected);
    assert!(engine.balances().verify(&scope(), &reg.id).await.unwrap().is_consistent());

    engine.db().close().await;
    for suffix in ["", "-wal", "-shm"] {
        let mut file = path.clone().into_os_string();
        file.push(suffix);
        let _ = std::fs::remove_file(file);
    }
}
