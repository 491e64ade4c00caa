//! # till-core: Pure Ledger Logic
//!
//! Money, domain types and every calculation of the cash register engine,
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till Architecture                                │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            Collaborators (checkout, admin screens)              │   │
//! │  │      register_sale ──► perform_audit ──► close ──► summary     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    till-engine                                  │   │
//! │  │    RegisterManager, Ledger, BalanceCalculator, AuditEngine      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  summary  │  │ reconcile │  │denomination│ │   │
//! │  │   │ Register  │  │  Summary  │  │ CashCount │  │  counter  │  │   │
//! │  │   │ Movement  │  │  Health   │  │ Evaluated │  │           │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    till-db (Database Layer)                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Register, Movement, Audit and their enums
//! - [`money`] - Money type with integer arithmetic
//! - [`denomination`] - Bills/coins counter
//! - [`summary`] - Balance & summary calculator
//! - [`reconcile`] - Audit evaluation
//! - [`validation`] - Input rules
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use till_core::{AuditStatus, CashCount, Money};
//!
//! let evaluated = CashCount::quick(Money::from_cents(12_500))
//!     .unwrap()
//!     .evaluate(Money::from_cents(5_000));
//!
//! assert_eq!(evaluated.difference().cents(), 7_500);
//! assert_eq!(evaluated.status(), AuditStatus::Surplus);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod denomination;
pub mod error;
pub mod money;
pub mod reconcile;
pub mod summary;
pub mod types;
pub mod validation;

#[cfg(test)]
mod reconcile_props;
#[cfg(test)]
mod summary_props;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use denomination::{DenominationInput, Denominations};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use reconcile::{AuditContext, CashCount, EvaluatedAudit};
pub use summary::{LedgerHealth, PaymentMethodTotals, Summary};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a register display name.
pub const MAX_NAME_LENGTH: usize = 100;

/// Maximum length of a movement description.
pub const MAX_DESCRIPTION_LENGTH: usize = 500;

/// Maximum length of a single notes entry.
pub const MAX_NOTES_LENGTH: usize = 2000;

/// Maximum magnitude of a single amount: a movement, a float or a count.
///
/// ## Business Reason
/// Catches mistyped amounts long before cents arithmetic can overflow.
/// $1,000,000,000.00.
pub const MAX_AMOUNT_CENTS: i64 = 100_000_000_000;

/// Maximum magnitude a register's running balance may reach.
///
/// $100,000,000,000.00. Appends that would cross it are rejected.
pub const MAX_BALANCE_CENTS: i64 = 10_000_000_000_000;

/// Maximum pieces of one denomination in a drawer count.
pub const MAX_DENOMINATION_COUNT: i64 = 1_000_000;
