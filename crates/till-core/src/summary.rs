//! # Balance & Summary Calculator
//!
//! Derives register totals from movement history. Pure: the engine loads the
//! register and its movements, this module does the math.
//!
//! ## Balances
//! ```text
//! expected = initial + income + sales + deposits
//!                    − expense − refunds − withdrawals
//!
//! derived  = expected + net adjustments      (what history says)
//! actual   = register.current_balance        (what appends tracked)
//!
//! difference = actual − expected             (shown to the cashier)
//! drift      = actual − derived              (zero on a healthy ledger)
//! ```
//!
//! `expected` leaves adjustments out on purpose: an audit compares a count
//! against what the shift's business activity should have produced. `derived`
//! includes them and is what `current_balance` must always equal.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Movement, MovementType, PaymentMethod, Register, RegisterStatus};

// =============================================================================
// Payment Method Totals
// =============================================================================

/// Inflow totals (income, sales, deposits) per payment method.
///
/// Every method is always present, zero when unused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PaymentMethodTotals {
    pub cash: Money,
    pub card: Money,
    pub transfer: Money,
    pub app: Money,
    pub other: Money,
}

impl PaymentMethodTotals {
    pub fn get(&self, method: PaymentMethod) -> Money {
        match method {
            PaymentMethod::Cash => self.cash,
            PaymentMethod::Card => self.card,
            PaymentMethod::Transfer => self.transfer,
            PaymentMethod::App => self.app,
            PaymentMethod::Other => self.other,
        }
    }

    fn slot(&mut self, method: PaymentMethod) -> &mut Money {
        match method {
            PaymentMethod::Cash => &mut self.cash,
            PaymentMethod::Card => &mut self.card,
            PaymentMethod::Transfer => &mut self.transfer,
            PaymentMethod::App => &mut self.app,
            PaymentMethod::Other => &mut self.other,
        }
    }

    /// Cash inflows; the default expected amount of an audit.
    #[inline]
    pub fn cash_total(&self) -> Money {
        self.cash
    }

    pub fn total(&self) -> Money {
        PaymentMethod::ALL.iter().map(|m| self.get(*m)).sum()
    }
}

// =============================================================================
// Summary
// =============================================================================

/// Point-in-time view of a register computed from its history.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Summary {
    pub register_id: String,
    pub status: RegisterStatus,
    pub initial_balance: Money,

    pub total_income: Money,
    pub total_expense: Money,
    pub total_sales: Money,
    pub total_refunds: Money,
    pub total_withdrawals: Money,
    pub total_deposits: Money,
    /// Sum of adjustment magnitudes.
    pub total_adjustments: Money,
    /// Signed sum of adjustments.
    pub net_adjustments: Money,

    pub payment_method_totals: PaymentMethodTotals,

    pub expected_balance: Money,
    pub actual_balance: Money,
    pub difference: Money,

    pub derived_balance: Money,
    pub drift: Money,

    pub movement_count: i64,
}

impl Summary {
    /// Folds a register's movement history into a summary.
    ///
    /// Movement order does not matter. Fails with
    /// [`CoreError::AmountOverflow`] when a total leaves the `i64` range.
    pub fn from_history<'a, I>(register: &Register, movements: I) -> CoreResult<Self>
    where
        I: IntoIterator<Item = &'a Movement>,
    {
        let overflow = || CoreError::AmountOverflow {
            register_id: register.id.clone(),
        };
        let add = |a: Money, b: Money| a.checked_add(b).ok_or_else(overflow);
        let sub = |a: Money, b: Money| a.checked_sub(b).ok_or_else(overflow);

        let mut s = Summary {
            register_id: register.id.clone(),
            status: register.status,
            initial_balance: register.initial_balance(),
            total_income: Money::zero(),
            total_expense: Money::zero(),
            total_sales: Money::zero(),
            total_refunds: Money::zero(),
            total_withdrawals: Money::zero(),
            total_deposits: Money::zero(),
            total_adjustments: Money::zero(),
            net_adjustments: Money::zero(),
            payment_method_totals: PaymentMethodTotals::default(),
            expected_balance: Money::zero(),
            actual_balance: register.current_balance(),
            difference: Money::zero(),
            derived_balance: Money::zero(),
            drift: Money::zero(),
            movement_count: 0,
        };

        for m in movements {
            let amount = m.amount();
            s.movement_count += 1;

            match m.movement_type {
                MovementType::Income => s.total_income = add(s.total_income, amount)?,
                MovementType::Expense => s.total_expense = add(s.total_expense, amount)?,
                MovementType::Sale => s.total_sales = add(s.total_sales, amount)?,
                MovementType::Refund => s.total_refunds = add(s.total_refunds, amount)?,
                MovementType::Withdrawal => {
                    s.total_withdrawals = add(s.total_withdrawals, amount)?
                }
                MovementType::Deposit => s.total_deposits = add(s.total_deposits, amount)?,
                MovementType::Adjustment => {
                    let magnitude = amount.checked_abs().ok_or_else(overflow)?;
                    s.total_adjustments = add(s.total_adjustments, magnitude)?;
                    s.net_adjustments = add(s.net_adjustments, amount)?;
                }
            }

            match m.movement_type {
                MovementType::Income | MovementType::Sale | MovementType::Deposit => {
                    let slot = s.payment_method_totals.slot(m.payment_method);
                    *slot = add(*slot, amount)?;
                }
                MovementType::Expense
                | MovementType::Refund
                | MovementType::Withdrawal
                | MovementType::Adjustment => {}
            }
        }

        let inflow = add(s.initial_balance, s.total_income)
            .and_then(|m| add(m, s.total_sales))
            .and_then(|m| add(m, s.total_deposits))?;
        let outflow = add(s.total_expense, s.total_refunds)
            .and_then(|m| add(m, s.total_withdrawals))?;
        s.expected_balance = sub(inflow, outflow)?;
        s.difference = sub(s.actual_balance, s.expected_balance)?;
        s.derived_balance = add(s.expected_balance, s.net_adjustments)?;
        s.drift = sub(s.actual_balance, s.derived_balance)?;
        Ok(s)
    }

    /// True when the tracked balance matches the history.
    #[inline]
    pub fn is_consistent(&self) -> bool {
        self.drift.is_zero()
    }

    pub fn health(&self) -> LedgerHealth {
        if self.is_consistent() {
            LedgerHealth::Consistent
        } else {
            LedgerHealth::Drifted {
                tracked: self.actual_balance,
                derived: self.derived_balance,
                drift: self.drift,
            }
        }
    }
}

/// Result of comparing `current_balance` with the history-derived balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LedgerHealth {
    Consistent,
    Drifted {
        tracked: Money,
        derived: Money,
        /// `tracked − derived`.
        drift: Money,
    },
}

impl LedgerHealth {
    pub fn is_consistent(&self) -> bool {
        matches!(self, LedgerHealth::Consistent)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
