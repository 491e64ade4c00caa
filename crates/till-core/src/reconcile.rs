//! # Audit Reconciliation
//!
//! An audit moves through three states, each a distinct type:
//!
//! ```text
//!   CashCount ──evaluate(expected)──► EvaluatedAudit ──commit(ctx)──► Audit
//!   (Collecting)                      (Evaluated)                     (Committed)
//!
//!   quick:    actual cash only
//!   detailed: actual cash + bills/coins breakdown
//! ```
//!
//! Only an `EvaluatedAudit` knows the difference and status, and only a
//! committed `Audit` has an id. The engine persists the `Audit` and, when the
//! evaluation asks for it, the corrective adjustment in one transaction.

use chrono::{DateTime, Utc};

use crate::denomination::{DenominationInput, Denominations};
use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{Audit, AuditStatus, Scope};
use crate::validation::validate_counted_amount;

/// Computes `actual − expected` and its classification.
pub fn evaluate(expected: Money, actual: Money) -> (Money, AuditStatus) {
    let difference = actual - expected;
    (difference, AuditStatus::classify(difference))
}

// =============================================================================
// Collecting
// =============================================================================

/// A physical drawer count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CashCount {
    actual: Money,
    denominations: Option<Denominations>,
}

impl CashCount {
    /// A count that only states the total.
    pub fn quick(actual: Money) -> Result<Self, ValidationError> {
        validate_actual(actual)?;
        Ok(CashCount {
            actual,
            denominations: None,
        })
    }

    /// A count with its bills/coins breakdown.
    ///
    /// The breakdown is sanitized; `actual` is kept as given.
    pub fn detailed(actual: Money, input: DenominationInput) -> Result<Self, ValidationError> {
        validate_actual(actual)?;
        Ok(CashCount {
            actual,
            denominations: Some(input.sanitize()?),
        })
    }

    #[inline]
    pub fn actual(&self) -> Money {
        self.actual
    }

    pub fn denominations(&self) -> Option<&Denominations> {
        self.denominations.as_ref()
    }

    /// `counted − actual` when the breakdown disagrees with the stated total.
    pub fn denomination_gap(&self) -> Option<Money> {
        self.denominations
            .as_ref()
            .map(|d| d.total() - self.actual)
            .filter(|gap| !gap.is_zero())
    }

    /// In strict mode a breakdown must add up to the stated total.
    pub fn check_denominations(&self, strict: bool) -> Result<(), ValidationError> {
        match (strict, self.denomination_gap()) {
            (true, Some(gap)) => Err(ValidationError::DenominationMismatch {
                asserted: self.actual,
                counted: self.actual + gap,
            }),
            _ => Ok(()),
        }
    }

    /// Compares the count with the expected amount.
    pub fn evaluate(self, expected: Money) -> EvaluatedAudit {
        let (difference, status) = evaluate(expected, self.actual);
        EvaluatedAudit {
            count: self,
            expected,
            difference,
            status,
        }
    }
}

fn validate_actual(actual: Money) -> Result<(), ValidationError> {
    validate_counted_amount("actual cash", actual)
}

// =============================================================================
// Evaluated
// =============================================================================

/// A count that has been compared with the expected amount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatedAudit {
    count: CashCount,
    expected: Money,
    difference: Money,
    status: AuditStatus,
}

impl EvaluatedAudit {
    pub fn expected(&self) -> Money {
        self.expected
    }

    pub fn actual(&self) -> Money {
        self.count.actual
    }

    pub fn difference(&self) -> Money {
        self.difference
    }

    pub fn status(&self) -> AuditStatus {
        self.status
    }

    pub fn count(&self) -> &CashCount {
        &self.count
    }

    /// Whether the ledger should absorb the difference.
    pub fn needs_adjustment(&self) -> bool {
        !self.difference.is_zero()
    }

    /// Description of the corrective movement.
    pub fn adjustment_description(&self) -> String {
        match self.status {
            AuditStatus::Surplus => format!("Audit surplus of {}", self.difference.abs()),
            AuditStatus::Shortage => format!("Audit shortage of {}", self.difference.abs()),
            AuditStatus::Balanced => "Audit balanced".to_string(),
        }
    }

    /// Freezes the evaluation into an immutable audit record.
    pub fn commit(self, ctx: AuditContext) -> Audit {
        Audit {
            id: ctx.id,
            tenant_id: ctx.scope.tenant_id,
            branch_id: ctx.scope.branch_id,
            register_id: ctx.register_id,
            performed_at: ctx.performed_at,
            performed_by: ctx.performed_by,
            expected_cash_cents: self.expected.cents(),
            actual_cash_cents: self.count.actual.cents(),
            difference_cents: self.difference.cents(),
            status: self.status,
            notes: ctx.notes,
            denominations: self.count.denominations,
            adjustment_movement_id: ctx.adjustment_movement_id,
        }
    }
}

/// Identity and bookkeeping fields supplied at commit time.
#[derive(Debug, Clone)]
pub struct AuditContext {
    pub id: String,
    pub scope: Scope,
    pub register_id: String,
    pub performed_by: String,
    pub performed_at: DateTime<Utc>,
    pub notes: Option<String>,
    pub adjustment_movement_id: Option<String>,
}

// =============================================================================
// Unit Tests
// =============================================================================
