//! # Balance Calculator
//!
//! Summaries and ledger health checks. A register keeps two balance
//! sources: `current_balance` maintained by appends, and the balance that
//! falls out of its movement history. They agree unless something wrote to
//! the store behind the engine's back.

use chrono::Utc;
use tracing::{info, warn};

use till_core::validation::validate_scope;
use till_core::{LedgerHealth, Register, Scope, Summary};
use till_db::{Database, MovementRepository, RegisterRepository};

use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone)]
pub struct BalanceCalculator {
    db: Database,
}

impl BalanceCalculator {
    pub(crate) fn new(db: Database) -> Self {
        BalanceCalculator { db }
    }

    /// Folds the register and its movements into a [`Summary`].
    ///
    /// Register and movements are read in one transaction so the summary is
    /// never built from a half-applied append.
    pub async fn summarize(&self, scope: &Scope, register_id: &str) -> EngineResult<Summary> {
        validate_scope(scope)?;

        let mut tx = self.db.begin().await?;
        let register = RegisterRepository::find(&mut tx, scope, register_id)
            .await?
            .ok_or_else(|| EngineError::not_found(register_id))?;
        let movements = MovementRepository::list_for_register(&mut tx, scope, register_id).await?;
        tx.commit().await?;

        Ok(Summary::from_history(&register, &movements)?)
    }

    /// Compares the tracked balance with the history-derived one.
    pub async fn verify(&self, scope: &Scope, register_id: &str) -> EngineResult<LedgerHealth> {
        let health = self.summarize(scope, register_id).await?.health();

        if let LedgerHealth::Drifted {
            tracked,
            derived,
            drift,
        } = health
        {
            warn!(
                register_id = %register_id,
                tracked = %tracked,
                derived = %derived,
                drift = %drift,
                "Ledger drift detected"
            );
        }

        Ok(health)
    }

    /// Rewrites `current_balance` from the movement history.
    pub async fn rebuild_balance(&self, scope: &Scope, register_id: &str) -> EngineResult<Register> {
        validate_scope(scope)?;

        let now = Utc::now();
        let mut tx = self.db.begin().await?;
        // false for a closed register too; find tells the cases apart
        RegisterRepository::lock(&mut tx, scope, register_id, now).await?;
        let register = RegisterRepository::find(&mut tx, scope, register_id)
            .await?
            .ok_or_else(|| EngineError::not_found(register_id))?;
        let movements = MovementRepository::list_for_register(&mut tx, scope, register_id).await?;
        let summary = Summary::from_history(&register, &movements)?;

        if summary.is_consistent() {
            tx.commit().await?;
            return Ok(register);
        }

        RegisterRepository::set_balance(&mut tx, scope, register_id, summary.derived_balance, now)
            .await?;
        let rebuilt = RegisterRepository::find(&mut tx, scope, register_id)
            .await?
            .ok_or_else(|| EngineError::not_found(register_id))?;
        tx.commit().await?;

        info!(
            register_id = %register_id,
            from = %summary.actual_balance,
            to = %summary.derived_balance,
            "Register balance rebuilt from history"
        );
        Ok(rebuilt)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
