//! # Register Lifecycle
//!
//! Opening and closing registers.
//!
//! ```text
//!   open ──► Open ──(append / audit)*──► close ──► Closed
//!                                          │
//!                                          └─ counted balance differs?
//!                                             → ADJUSTMENT in the same tx
//! ```
//!
//! A closed register never reopens.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use till_core::validation::{
    validate_actor, validate_counted_balance, validate_initial_amount, validate_notes,
    validate_register_name, validate_scope,
};
use till_core::{
    append_note, CloseRegister, MovementType, NewMovement, OpenRegister, PaymentMethod, Register,
    RegisterStatus, Scope, Summary,
};
use till_db::{CloseRecord, Database, MovementRepository, RegisterRepository};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::ledger::append_in;

/// Opens, closes and looks up registers.
#[derive(Debug, Clone)]
pub struct RegisterManager {
    db: Database,
    config: Arc<EngineConfig>,
}

impl RegisterManager {
    pub(crate) fn new(db: Database, config: Arc<EngineConfig>) -> Self {
        RegisterManager { db, config }
    }

    /// Opens a register with its float.
    ///
    /// With `registers.enforce_single_open`, fails with `RegisterAlreadyOpen`
    /// when the branch already has an open register.
    pub async fn open(
        &self,
        scope: &Scope,
        actor: &str,
        request: OpenRegister,
    ) -> EngineResult<Register> {
        validate_scope(scope)?;
        validate_actor(actor)?;
        validate_initial_amount(request.initial_amount)?;
        validate_notes(request.notes.as_deref())?;

        let now = Utc::now();
        let name = match request.name.as_deref() {
            Some(name) if !name.trim().is_empty() => validate_register_name(name)?,
            _ => format!("{} {}", self.config.registers.default_name, now.format("%Y-%m-%d %H:%M")),
        };

        let register = Register {
            id: Uuid::new_v4().to_string(),
            tenant_id: scope.tenant_id.clone(),
            branch_id: scope.branch_id.clone(),
            name,
            status: RegisterStatus::Open,
            initial_balance_cents: request.initial_amount.cents(),
            current_balance_cents: request.initial_amount.cents(),
            expected_final_balance_cents: None,
            actual_final_balance_cents: None,
            opened_at: now,
            opened_by: actor.to_string(),
            closed_at: None,
            closed_by: None,
            notes: append_note(None, request.notes.as_deref().unwrap_or_default()),
            updated_at: now,
        };

        let single_open = self.config.registers.enforce_single_open;
        let mut tx = self.db.begin().await?;
        if !RegisterRepository::insert_open(&mut tx, &register, single_open).await? {
            let existing = RegisterRepository::find_open(&mut tx, scope).await?;
            return Err(EngineError::RegisterAlreadyOpen {
                branch_id: scope.branch_id.clone(),
                register_id: existing.map(|r| r.id).unwrap_or_default(),
            });
        }
        tx.commit().await?;

        info!(
            scope = %scope,
            register_id = %register.id,
            name = %register.name,
            initial_balance = %register.initial_balance(),
            opened_by = actor,
            "Register opened"
        );
        Ok(register)
    }

    /// Closes an open register.
    ///
    /// The expected balance is frozen from the movement history. A counted
    /// balance that differs from it is absorbed by one ADJUSTMENT of
    /// `actual − expected`, committed together with the status change.
    pub async fn close(
        &self,
        scope: &Scope,
        register_id: &str,
        actor: &str,
        request: CloseRegister,
    ) -> EngineResult<Register> {
        validate_scope(scope)?;
        validate_actor(actor)?;
        validate_notes(request.notes.as_deref())?;
        if let Some(actual) = request.actual_balance {
            validate_counted_balance(actual)?;
        }

        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        RegisterRepository::lock(&mut tx, scope, register_id, now).await?;
        let register = RegisterRepository::find(&mut tx, scope, register_id)
            .await?
            .ok_or_else(|| EngineError::not_found(register_id))?;
        if !register.is_open() {
            return Err(EngineError::AlreadyClosed {
                register_id: register.id,
            });
        }

        let movements = MovementRepository::list_for_register(&mut tx, scope, register_id).await?;
        let summary = Summary::from_history(&register, &movements)?;
        let expected = summary.expected_balance;

        if let Some(actual) = request.actual_balance {
            let difference = actual - expected;
            if !difference.is_zero() {
                let adjustment = NewMovement::new(
                    register_id,
                    MovementType::Adjustment,
                    difference,
                    PaymentMethod::Cash,
                    format!("Close adjustment: counted {actual}, expected {expected}"),
                );
                let movement = append_in(&mut tx, scope, actor, adjustment, now).await?;
                warn!(
                    register_id = %register_id,
                    movement_id = %movement.id,
                    difference = %difference,
                    "Counted balance differs at close"
                );
            }
        }

        let notes = append_note(
            register.notes.as_deref(),
            request.notes.as_deref().unwrap_or_default(),
        );
        let record = CloseRecord {
            expected_final_balance: expected,
            actual_final_balance: request.actual_balance,
            closed_at: now,
            closed_by: actor,
            notes: notes.as_deref(),
        };
        if !RegisterRepository::mark_closed(&mut tx, scope, register_id, &record).await? {
            return Err(EngineError::AlreadyClosed {
                register_id: register_id.to_string(),
            });
        }

        let closed = RegisterRepository::find(&mut tx, scope, register_id)
            .await?
            .ok_or_else(|| EngineError::not_found(register_id))?;
        tx.commit().await?;

        info!(
            scope = %scope,
            register_id = %closed.id,
            expected = %expected,
            closed_by = actor,
            "Register closed"
        );
        Ok(closed)
    }

    /// Gets a register by id.
    pub async fn get(&self, scope: &Scope, register_id: &str) -> EngineResult<Register> {
        validate_scope(scope)?;
        self.db
            .registers()
            .get(scope, register_id)
            .await?
            .ok_or_else(|| EngineError::not_found(register_id))
    }

    /// All registers of the scope, newest-first.
    pub async fn list(&self, scope: &Scope) -> EngineResult<Vec<Register>> {
        validate_scope(scope)?;
        Ok(self.db.registers().list(scope).await?)
    }

    /// Open registers of the scope, newest-first.
    pub async fn list_open(&self, scope: &Scope) -> EngineResult<Vec<Register>> {
        validate_scope(scope)?;
        Ok(self.db.registers().list_open(scope).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::testing::{engine, engine_with, open, scope};
    use crate::{EngineConfig, EngineError};
    use till_core::{
        CloseRegister, Money, MovementType, NewMovement, OpenRegister, PaymentMethod,
        RegisterStatus,
    };

    #[tokio::test]
    async fn test_open_sets_balances() {
        let engine = engine().await;
        let reg = engine
            .registers()
            .open(
                &scope(),
                "ana",
                OpenRegister::new(Money::from_cents(10_000))
                    .with_name("  Front  ")
                    .with_notes("float from safe"),
            )
            .await
            .unwrap();

        assert_eq!(reg.name, "Front");
        assert_eq!(reg.status, RegisterStatus::Open);
        assert_eq!(reg.initial_balance_cents, 10_000);
        assert_eq!(reg.current_balance_cents, 10_000);
        assert_eq!(reg.note_entries(), vec!["float from safe"]);
        assert_eq!(reg.opened_by, "ana");
    }

    #[tokio::test]
    async fn test_default_name() {
        let engine = engine().await;
        let reg = engine
            .registers()
            .open(&scope(), "ana", OpenRegister::new(Money::zero()))
            .await
            .unwrap();
        assert!(reg.name.starts_with("Register "));
    }

    #[tokio::test]
    async fn test_open_rejects_negative_float() {
        let engine = engine().await;
        let err = engine
            .registers()
            .open(&scope(), "ana", OpenRegister::new(Money::from_cents(-1)))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(engine.registers().list(&scope()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_oversized_amounts_rejected() {
        let engine = engine().await;
        let err = engine
            .registers()
            .open(&scope(), "ana", OpenRegister::new(Money::from_cents(i64::MAX)))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert!(engine.registers().list(&scope()).await.unwrap().is_empty());

        let reg = open(&engine, 10_000).await;
        let err = engine
            .registers()
            .close(
                &scope(),
                &reg.id,
                "ana",
                CloseRegister::new().with_actual_balance(Money::from_cents(i64::MAX)),
            )
            .await
            .unwrap_err();
        assert!(err.is_validation());

        let reg = engine.registers().get(&scope(), &reg.id).await.unwrap();
        assert!(reg.is_open());
        assert_eq!(reg.current_balance_cents, 10_000);
    }

    #[tokio::test]
    async fn test_single_open_policy() {
        let engine = engine().await;
        let first = open(&engine, 0).await;

        let err = engine
            .registers()
            .open(&scope(), "ana", OpenRegister::new(Money::zero()))
            .await
            .unwrap_err();
        match err {
            EngineError::RegisterAlreadyOpen { register_id, .. } => assert_eq!(register_id, first.id),
            other => panic!("unexpected error: {other}"),
        }

        engine
            .registers()
            .close(&scope(), &first.id, "ana", CloseRegister::new())
            .await
            .unwrap();
        open(&engine, 0).await;
    }

    #[tokio::test]
    async fn test_single_open_policy_disabled() {
        let mut config = EngineConfig::default();
        config.registers.enforce_single_open = false;
        let engine = engine_with(config).await;

        open(&engine, 0).await;
        open(&engine, 0).await;
        assert_eq!(engine.registers().list_open(&scope()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_close_freezes_expected_balance() {
        let engine = engine().await;
        let reg = open(&engine, 10_000).await;
        engine
            .ledger()
            .append(
                &scope(),
                "ana",
                NewMovement::new(&reg.id, MovementType::Sale, Money::from_cents(5_000), PaymentMethod::Card, "Sale"),
            )
            .await
            .unwrap();

        let closed = engine
            .registers()
            .close(&scope(), &reg.id, "bo", CloseRegister::new().with_notes("end of day"))
            .await
            .unwrap();

        assert_eq!(closed.status, RegisterStatus::Closed);
        assert_eq!(closed.expected_final_balance_cents, Some(15_000));
        assert_eq!(closed.actual_final_balance_cents, None);
        assert_eq!(closed.closed_by.as_deref(), Some("bo"));
        assert!(closed.closed_at.is_some());
        assert_eq!(closed.note_entries(), vec!["end of day"]);
        assert!(engine.registers().list_open(&scope()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_close_with_counted_balance_adjusts() {
        let engine = engine().await;
        let reg = open(&engine, 10_000).await;

        let closed = engine
            .registers()
            .close(
                &scope(),
                &reg.id,
                "ana",
                CloseRegister::new().with_actual_balance(Money::from_cents(9_850)),
            )
            .await
            .unwrap();

        assert_eq!(closed.expected_final_balance_cents, Some(10_000));
        assert_eq!(closed.actual_final_balance_cents, Some(9_850));
        assert_eq!(closed.current_balance_cents, 9_850);

        let movements = engine.ledger().list(&scope(), &reg.id).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].movement_type, MovementType::Adjustment);
        assert_eq!(movements[0].amount_cents, -150);
    }

    #[tokio::test]
    async fn test_close_with_matching_count_adds_nothing() {
        let engine = engine().await;
        let reg = open(&engine, 10_000).await;

        engine
            .registers()
            .close(
                &scope(),
                &reg.id,
                "ana",
                CloseRegister::new().with_actual_balance(Money::from_cents(10_000)),
            )
            .await
            .unwrap();
        assert!(engine.ledger().list(&scope(), &reg.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_close_twice_and_missing() {
        let engine = engine().await;
        let reg = open(&engine, 0).await;
        engine
            .registers()
            .close(&scope(), &reg.id, "ana", CloseRegister::new())
            .await
            .unwrap();

        let err = engine
            .registers()
            .close(&scope(), &reg.id, "ana", CloseRegister::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::AlreadyClosed { .. }));

        let err = engine
            .registers()
            .close(&scope(), "missing", "ana", CloseRegister::new())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::RegisterNotFound { .. }));

        let err = engine.registers().get(&scope(), "missing").await.unwrap_err();
        assert!(matches!(err, EngineError::RegisterNotFound { .. }));
    }

    #[tokio::test]
    async fn test_close_keeps_open_notes() {
        let engine = engine().await;
        let reg = engine
            .registers()
            .open(&scope(), "ana", OpenRegister::new(Money::zero()).with_notes("opened early"))
            .await
            .unwrap();

        let closed = engine
            .registers()
            .close(&scope(), &reg.id, "ana", CloseRegister::new().with_notes("closed late"))
            .await
            .unwrap();
        assert_eq!(closed.note_entries(), vec!["opened early", "closed late"]);
    }
}
