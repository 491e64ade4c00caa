//! # Audit Engine
//!
//! Cash counts and reconciliation.
//!
//! ## Audit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  AuditRequest                                                          │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  CashCount (quick | detailed)   sanitize denominations,                │
//! │      │                          strict mode: breakdown must add up     │
//! │      ▼                                                                  │
//! │  BEGIN ── lock register ── expected = given | summary cash total       │
//! │      │                                                                  │
//! │      ▼                                                                  │
//! │  EvaluatedAudit    difference = actual − expected                      │
//! │      │             difference ≠ 0 and register open?                   │
//! │      │               → ADJUSTMENT(difference), reference = audit id    │
//! │      ▼                                                                  │
//! │  Audit (committed) ── INSERT ── COMMIT                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use till_core::validation::{validate_actor, validate_amount_limit, validate_notes, validate_scope};
use till_core::{
    Audit, AuditContext, CashCount, DenominationInput, Money, MovementType, NewMovement,
    PaymentMethod, Scope, Summary,
};
use till_db::{AuditRepository, Database, MovementRepository, RegisterRepository};

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::ledger::append_in;

/// A drawer count submitted for reconciliation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditRequest {
    pub register_id: String,
    /// Counted cash as asserted by the caller.
    pub actual_cash: Money,
    /// Defaults to the cash inflows of the register.
    pub expected_cash: Option<Money>,
    pub notes: Option<String>,
    pub denominations: Option<DenominationInput>,
}

impl AuditRequest {
    pub fn new(register_id: impl Into<String>, actual_cash: Money) -> Self {
        AuditRequest {
            register_id: register_id.into(),
            actual_cash,
            ..Default::default()
        }
    }

    pub fn with_expected(mut self, expected: Money) -> Self {
        self.expected_cash = Some(expected);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_denominations(mut self, denominations: DenominationInput) -> Self {
        self.denominations = Some(denominations);
        self
    }
}

#[derive(Debug, Clone)]
pub struct AuditEngine {
    db: Database,
    config: Arc<EngineConfig>,
}

impl AuditEngine {
    pub(crate) fn new(db: Database, config: Arc<EngineConfig>) -> Self {
        AuditEngine { db, config }
    }

    /// Counts, evaluates and commits an audit.
    ///
    /// The audit and its adjustment (if any) commit together. Closed
    /// registers can still be audited; they just get no adjustment.
    pub async fn perform_audit(
        &self,
        scope: &Scope,
        actor: &str,
        request: AuditRequest,
    ) -> EngineResult<Audit> {
        validate_scope(scope)?;
        validate_actor(actor)?;
        validate_notes(request.notes.as_deref())?;
        if let Some(expected) = request.expected_cash {
            validate_amount_limit("expected cash", expected)?;
        }

        let count = match request.denominations {
            Some(input) => CashCount::detailed(request.actual_cash, input)?,
            None => CashCount::quick(request.actual_cash)?,
        };
        count.check_denominations(self.config.audit.strict_denominations)?;
        if let Some(gap) = count.denomination_gap() {
            warn!(
                register_id = %request.register_id,
                asserted = %count.actual(),
                gap = %gap,
                "Denomination breakdown does not match counted cash"
            );
        }

        let register_id = request.register_id;
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        // a closed register is audited under the lock but keeps its row as is
        RegisterRepository::lock(&mut tx, scope, &register_id, now).await?;
        let register = RegisterRepository::find(&mut tx, scope, &register_id)
            .await?
            .ok_or_else(|| EngineError::not_found(&register_id))?;

        let expected = match request.expected_cash {
            Some(expected) => expected,
            None => {
                let movements =
                    MovementRepository::list_for_register(&mut tx, scope, &register_id).await?;
                Summary::from_history(&register, &movements)?
                    .payment_method_totals
                    .cash_total()
            }
        };

        let evaluated = count.evaluate(expected);
        let audit_id = Uuid::new_v4().to_string();

        let adjustment_movement_id = if evaluated.needs_adjustment()
            && register.is_open()
            && self.config.audit.adjust_on_discrepancy
        {
            let adjustment = NewMovement::new(
                &register_id,
                MovementType::Adjustment,
                evaluated.difference(),
                PaymentMethod::Cash,
                evaluated.adjustment_description(),
            )
            .with_reference(&audit_id);
            let movement = append_in(&mut tx, scope, actor, adjustment, now).await?;
            Some(movement.id)
        } else {
            None
        };

        let audit = evaluated.commit(AuditContext {
            id: audit_id,
            scope: scope.clone(),
            register_id,
            performed_by: actor.to_string(),
            performed_at: now,
            notes: request.notes,
            adjustment_movement_id,
        });
        AuditRepository::insert(&mut tx, &audit).await?;
        tx.commit().await?;

        info!(
            audit_id = %audit.id,
            register_id = %audit.register_id,
            expected = %audit.expected_cash(),
            actual = %audit.actual_cash(),
            status = %audit.status,
            adjusted = audit.adjustment_movement_id.is_some(),
            "Audit committed"
        );
        Ok(audit)
    }

    /// Audits of a register, newest-first.
    pub async fn list_audits(&self, scope: &Scope, register_id: &str) -> EngineResult<Vec<Audit>> {
        validate_scope(scope)?;
        Ok(self.db.audits().list(scope, register_id).await?)
    }

    /// The most recent audit of a register.
    pub async fn last_audit(&self, scope: &Scope, register_id: &str) -> EngineResult<Option<Audit>> {
        validate_scope(scope)?;
        Ok(self.db.audits().last(scope, register_id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
