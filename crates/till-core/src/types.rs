//! # Domain Types
//!
//! Core domain types of the cash register ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Register     │   │    Movement     │   │     Audit       │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  register_id    │   │  register_id ──►│       │
//! │  │  status         │   │  movement_type  │   │  expected_cash  │       │
//! │  │  initial_bal.   │   │  amount_cents   │   │  actual_cash    │       │
//! │  │  current_bal.   │   │  payment_method │   │  difference     │       │
//! │  └─────────────────┘   └─────────────────┘   │  status         │       │
//! │                                              └─────────────────┘       │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ RegisterStatus  │   │  MovementType   │   │  AuditStatus    │       │
//! │  │  Open           │   │  Income  (+)    │   │  Balanced       │       │
//! │  │  Closed         │   │  Sale    (+)    │   │  Surplus        │       │
//! │  └─────────────────┘   │  Deposit (+)    │   │  Shortage       │       │
//! │                        │  Expense (−)    │   └─────────────────┘       │
//! │                        │  Refund  (−)    │                              │
//! │                        │  Withdrawal (−) │                              │
//! │                        │  Adjustment (±) │                              │
//! │                        └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Registers own their movements and audits by reference (`register_id`),
//! never by containment. Every row carries the `(tenant_id, branch_id)` scope.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::denomination::Denominations;
use crate::error::{CoreError, CoreResult};
use crate::money::Money;

// =============================================================================
// Scope
// =============================================================================

/// The tenant/branch pair every operation is scoped to.
///
/// Resolved by the hosting application before calling into the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Scope {
    pub tenant_id: String,
    pub branch_id: String,
}

impl Scope {
    /// Creates a scope from tenant and branch identifiers.
    pub fn new(tenant_id: impl Into<String>, branch_id: impl Into<String>) -> Self {
        Scope {
            tenant_id: tenant_id.into(),
            branch_id: branch_id.into(),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.tenant_id, self.branch_id)
    }
}

// =============================================================================
// Register Status
// =============================================================================

/// Lifecycle state of a register. `Open → Closed`, never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RegisterStatus {
    /// Accepting movements.
    Open,
    /// Closed out; history is read-only.
    Closed,
}

impl RegisterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegisterStatus::Open => "open",
            RegisterStatus::Closed => "closed",
        }
    }
}

impl fmt::Display for RegisterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Register
// =============================================================================

/// A named till scoped to one tenant and branch.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Register {
    /// Unique identifier (UUID v4).
    pub id: String,

    pub tenant_id: String,

    pub branch_id: String,

    /// Display name ("Register 2026-10-19 08:00").
    pub name: String,

    pub status: RegisterStatus,

    /// Float counted into the drawer at open.
    pub initial_balance_cents: i64,

    /// Running total maintained by every ledger append.
    pub current_balance_cents: i64,

    /// Expected balance frozen at close.
    pub expected_final_balance_cents: Option<i64>,

    /// Counted balance supplied at close, if any.
    pub actual_final_balance_cents: Option<i64>,

    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,

    pub opened_by: String,

    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,

    pub closed_by: Option<String>,

    /// Append-only notes log, one entry per line.
    pub notes: Option<String>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Register {
    /// Returns the opening float as Money.
    #[inline]
    pub fn initial_balance(&self) -> Money {
        Money::from_cents(self.initial_balance_cents)
    }

    /// Returns the tracked running balance as Money.
    #[inline]
    pub fn current_balance(&self) -> Money {
        Money::from_cents(self.current_balance_cents)
    }

    /// Returns the expected balance recorded at close.
    #[inline]
    pub fn expected_final_balance(&self) -> Option<Money> {
        self.expected_final_balance_cents.map(Money::from_cents)
    }

    /// Returns the counted balance recorded at close.
    #[inline]
    pub fn actual_final_balance(&self) -> Option<Money> {
        self.actual_final_balance_cents.map(Money::from_cents)
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == RegisterStatus::Open
    }

    /// Fails unless the register still accepts movements.
    pub fn ensure_open(&self) -> CoreResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(CoreError::InvalidRegisterStatus {
                register_id: self.id.clone(),
                status: self.status.to_string(),
            })
        }
    }

    /// Returns the notes log as individual entries.
    pub fn note_entries(&self) -> Vec<&str> {
        self.notes
            .as_deref()
            .map(|n| n.lines().filter(|l| !l.trim().is_empty()).collect())
            .unwrap_or_default()
    }
}

/// Appends an entry to a newline-separated notes log.
pub fn append_note(log: Option<&str>, entry: &str) -> Option<String> {
    let entry = entry.trim();
    match (log, entry.is_empty()) {
        (existing, true) => existing.map(str::to_string),
        (Some(existing), false) if !existing.is_empty() => Some(format!("{existing}\n{entry}")),
        (_, false) => Some(entry.to_string()),
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How the money moved.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash in the drawer.
    Cash,
    Card,
    Transfer,
    /// Third-party ordering app settlement.
    App,
    Other,
}

impl PaymentMethod {
    /// Every method, in reporting order.
    pub const ALL: [PaymentMethod; 5] = [
        PaymentMethod::Cash,
        PaymentMethod::Card,
        PaymentMethod::Transfer,
        PaymentMethod::App,
        PaymentMethod::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Card => "card",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::App => "app",
            PaymentMethod::Other => "other",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Movement Type
// =============================================================================

/// How a movement type moves the register balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceEffect {
    Increase,
    Decrease,
    /// The stored amount already carries its sign.
    Signed,
}

/// The kind of monetary event.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// Manual cash-in (e.g., change brought from the safe).
    Income,
    /// Manual cash-out for a purchase.
    Expense,
    /// Order payment recorded by checkout.
    Sale,
    /// Order refund recorded by checkout.
    Refund,
    /// Cash taken out of the drawer (e.g., to the bank).
    Withdrawal,
    /// Cash put into the drawer.
    Deposit,
    /// Correction created by an audit or a counted close.
    Adjustment,
}

impl MovementType {
    /// Sign semantics of this type.
    pub const fn effect(&self) -> BalanceEffect {
        match self {
            MovementType::Income | MovementType::Sale | MovementType::Deposit => {
                BalanceEffect::Increase
            }
            MovementType::Expense | MovementType::Refund | MovementType::Withdrawal => {
                BalanceEffect::Decrease
            }
            MovementType::Adjustment => BalanceEffect::Signed,
        }
    }

    /// Converts a caller-supplied amount into the stored amount.
    ///
    /// Everything except adjustments is stored as a non-negative magnitude.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::{Money, MovementType};
    ///
    /// let stored = MovementType::Expense.normalize_amount(Money::from_cents(-2000));
    /// assert_eq!(stored.cents(), 2000);
    ///
    /// let stored = MovementType::Adjustment.normalize_amount(Money::from_cents(-500));
    /// assert_eq!(stored.cents(), -500);
    /// ```
    pub const fn normalize_amount(&self, amount: Money) -> Money {
        match self.effect() {
            BalanceEffect::Signed => amount,
            BalanceEffect::Increase | BalanceEffect::Decrease => amount.abs(),
        }
    }

    /// Balance delta for a stored amount.
    pub fn balance_delta(&self, stored: Money) -> Money {
        match self.effect() {
            BalanceEffect::Increase => stored,
            BalanceEffect::Decrease => -stored,
            BalanceEffect::Signed => stored,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::Income => "income",
            MovementType::Expense => "expense",
            MovementType::Sale => "sale",
            MovementType::Refund => "refund",
            MovementType::Withdrawal => "withdrawal",
            MovementType::Deposit => "deposit",
            MovementType::Adjustment => "adjustment",
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Movement
// =============================================================================

/// One immutable monetary event on a register.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Movement {
    pub id: String,
    pub tenant_id: String,
    pub branch_id: String,
    pub register_id: String,
    /// Position in the register's ledger, starting at 1.
    pub sequence: i64,
    pub movement_type: MovementType,
    /// Magnitude, or signed value for adjustments.
    pub amount_cents: i64,
    pub payment_method: PaymentMethod,
    pub description: String,
    pub reference: Option<String>,
    /// Back-reference to the order, never ownership.
    pub order_id: Option<String>,
    pub order_number: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub created_by: String,
}

impl Movement {
    /// Returns the stored amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// Returns the signed effect of this movement on the balance.
    #[inline]
    pub fn balance_delta(&self) -> Money {
        self.movement_type.balance_delta(self.amount())
    }
}

/// A movement as requested by a caller, before the ledger stamps it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewMovement {
    pub register_id: String,
    pub movement_type: MovementType,
    pub amount: Money,
    pub payment_method: PaymentMethod,
    pub description: String,
    pub reference: Option<String>,
    pub order_id: Option<String>,
    pub order_number: Option<String>,
}

impl NewMovement {
    pub fn new(
        register_id: impl Into<String>,
        movement_type: MovementType,
        amount: Money,
        payment_method: PaymentMethod,
        description: impl Into<String>,
    ) -> Self {
        NewMovement {
            register_id: register_id.into(),
            movement_type,
            amount,
            payment_method,
            description: description.into(),
            reference: None,
            order_id: None,
            order_number: None,
        }
    }

    /// Attaches a free-form reference (receipt number, audit id).
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Attaches the originating order.
    pub fn with_order(mut self, order_id: impl Into<String>, order_number: Option<String>) -> Self {
        self.order_id = Some(order_id.into());
        self.order_number = order_number;
        self
    }
}

// =============================================================================
// Audit Status
// =============================================================================

/// Outcome of comparing a count with the expected amount.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Balanced,
    /// More cash than expected.
    Surplus,
    /// Less cash than expected.
    Shortage,
}

impl AuditStatus {
    /// Classifies a difference (`actual − expected`).
    ///
    /// ## Example
    /// ```rust
    /// use till_core::{AuditStatus, Money};
    ///
    /// assert_eq!(AuditStatus::classify(Money::zero()), AuditStatus::Balanced);
    /// assert_eq!(AuditStatus::classify(Money::from_cents(7500)), AuditStatus::Surplus);
    /// assert_eq!(AuditStatus::classify(Money::from_cents(-1)), AuditStatus::Shortage);
    /// ```
    pub fn classify(difference: Money) -> Self {
        match difference.cents().cmp(&0) {
            std::cmp::Ordering::Equal => AuditStatus::Balanced,
            std::cmp::Ordering::Greater => AuditStatus::Surplus,
            std::cmp::Ordering::Less => AuditStatus::Shortage,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Balanced => "balanced",
            AuditStatus::Surplus => "surplus",
            AuditStatus::Shortage => "shortage",
        }
    }
}

impl fmt::Display for AuditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Audit
// =============================================================================

/// An immutable reconciliation snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Audit {
    pub id: String,
    pub tenant_id: String,
    pub branch_id: String,
    pub register_id: String,
    #[ts(as = "String")]
    pub performed_at: DateTime<Utc>,
    pub performed_by: String,
    pub expected_cash_cents: i64,
    /// The counted amount as asserted by the caller.
    pub actual_cash_cents: i64,
    /// `actual_cash − expected_cash`.
    pub difference_cents: i64,
    pub status: AuditStatus,
    pub notes: Option<String>,
    pub denominations: Option<Denominations>,
    /// The corrective movement this audit produced, if any.
    pub adjustment_movement_id: Option<String>,
}

impl Audit {
    #[inline]
    pub fn expected_cash(&self) -> Money {
        Money::from_cents(self.expected_cash_cents)
    }

    #[inline]
    pub fn actual_cash(&self) -> Money {
        Money::from_cents(self.actual_cash_cents)
    }

    #[inline]
    pub fn difference(&self) -> Money {
        Money::from_cents(self.difference_cents)
    }

    /// Total of the denomination breakdown, if one was recorded.
    pub fn denomination_total(&self) -> Option<Money> {
        self.denominations.as_ref().map(Denominations::total)
    }

    /// `counted − asserted` when the breakdown disagrees with `actual_cash`.
    pub fn denomination_mismatch(&self) -> Option<Money> {
        self.denomination_total()
            .map(|counted| counted - self.actual_cash())
            .filter(|gap| !gap.is_zero())
    }
}

// =============================================================================
// Lifecycle Requests
// =============================================================================

/// Parameters for opening a register.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OpenRegister {
    pub initial_amount: Money,
    pub name: Option<String>,
    pub notes: Option<String>,
}

impl OpenRegister {
    pub fn new(initial_amount: Money) -> Self {
        OpenRegister {
            initial_amount,
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// Parameters for closing a register.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CloseRegister {
    /// Counted drawer total; a mismatch creates an adjustment.
    pub actual_balance: Option<Money>,
    pub notes: Option<String>,
}

impl CloseRegister {
    pub fn new() -> Self {
        CloseRegister::default()
    }

    pub fn with_actual_balance(mut self, actual: Money) -> Self {
        self.actual_balance = Some(actual);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn register(status: RegisterStatus) -> Register {
        let now = Utc::now();
        Register {
            id: "reg-1".to_string(),
            tenant_id: "t".to_string(),
            branch_id: "b".to_string(),
            name: "Front".to_string(),
            status,
            initial_balance_cents: 10_000,
            current_balance_cents: 10_000,
            expected_final_balance_cents: None,
            actual_final_balance_cents: None,
            opened_at: now,
            opened_by: "ana".to_string(),
            closed_at: None,
            closed_by: None,
            notes: None,
            updated_at: now,
        }
    }

    #[test]
    fn test_sign_table() {
        let amount = Money::from_cents(500);
        assert_eq!(MovementType::Income.balance_delta(amount).cents(), 500);
        assert_eq!(MovementType::Sale.balance_delta(amount).cents(), 500);
        assert_eq!(MovementType::Deposit.balance_delta(amount).cents(), 500);
        assert_eq!(MovementType::Expense.balance_delta(amount).cents(), -500);
        assert_eq!(MovementType::Refund.balance_delta(amount).cents(), -500);
        assert_eq!(MovementType::Withdrawal.balance_delta(amount).cents(), -500);
        assert_eq!(MovementType::Adjustment.balance_delta(amount).cents(), 500);
        assert_eq!(
            MovementType::Adjustment
                .balance_delta(Money::from_cents(-500))
                .cents(),
            -500
        );
    }

    #[test]
    fn test_normalize_amount() {
        let negative = Money::from_cents(-2000);
        assert_eq!(MovementType::Sale.normalize_amount(negative).cents(), 2000);
        assert_eq!(MovementType::Withdrawal.normalize_amount(negative).cents(), 2000);
        assert_eq!(MovementType::Adjustment.normalize_amount(negative).cents(), -2000);

        let min = Money::from_cents(i64::MIN);
        assert_eq!(MovementType::Refund.normalize_amount(min).cents(), i64::MAX);
    }

    #[test]
    fn test_ensure_open() {
        assert!(register(RegisterStatus::Open).ensure_open().is_ok());
        let err = register(RegisterStatus::Closed).ensure_open().unwrap_err();
        assert!(matches!(err, CoreError::InvalidRegisterStatus { .. }));
    }

    #[test]
    fn test_append_note() {
        assert_eq!(append_note(None, "  "), None);
        assert_eq!(append_note(None, "float counted"), Some("float counted".to_string()));
        assert_eq!(
            append_note(Some("opened"), "closed early"),
            Some("opened\nclosed early".to_string())
        );
        assert_eq!(append_note(Some("opened"), ""), Some("opened".to_string()));

        let mut reg = register(RegisterStatus::Open);
        reg.notes = append_note(Some("opened"), "closed");
        assert_eq!(reg.note_entries(), vec!["opened", "closed"]);
    }

    #[test]
    fn test_enum_serialization() {
        assert_eq!(
            serde_json::to_string(&MovementType::Withdrawal).unwrap(),
            "\"withdrawal\""
        );
        assert_eq!(serde_json::to_string(&PaymentMethod::App).unwrap(), "\"app\"");
        assert_eq!(
            serde_json::to_string(&AuditStatus::Shortage).unwrap(),
            "\"shortage\""
        );
    }

    #[test]
    fn test_new_movement_builder() {
        let m = NewMovement::new(
            "reg-1",
            MovementType::Sale,
            Money::from_cents(1250),
            PaymentMethod::Card,
            "Sale",
        )
        .with_order("order-9", Some("A-17".to_string()))
        .with_reference("receipt-3");

        assert_eq!(m.order_id.as_deref(), Some("order-9"));
        assert_eq!(m.order_number.as_deref(), Some("A-17"));
        assert_eq!(m.reference.as_deref(), Some("receipt-3"));
    }
}
