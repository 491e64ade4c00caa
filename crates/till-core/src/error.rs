//! # Error Types
//!
//! Domain-specific error types for till-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  till-core errors (this file)                                          │
//! │  ├── CoreError        - Ledger rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  till-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  till-engine errors (separate crate)                                   │
//! │  └── EngineError      - What collaborators see                         │
//! │                                                                         │
//! │  Flow: ValidationError → EngineError ← DbError                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (field, register ID, amounts)
//! 3. Errors are enum variants, never String
//! 4. Validation messages are surfaced verbatim to the caller

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Ledger rule violations detected by pure code.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A movement or close was attempted on a register that is not open.
    #[error("Register {register_id} is {status}, cannot perform operation")]
    InvalidRegisterStatus { register_id: String, status: String },

    /// A register's totals do not fit in `i64` cents.
    ///
    /// Only reachable through rows written around the engine's amount limits.
    #[error("Totals of register {register_id} overflow the supported amount range")]
    AmountOverflow { register_id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These are always rejected synchronously and never retried.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Monetary amount is not acceptable for this operation.
    #[error("Invalid {field}: {reason}")]
    InvalidAmount { field: String, reason: String },

    /// A denomination entry cannot be counted.
    #[error("Invalid denomination {face_value_cents} in {group}: {reason}")]
    InvalidDenomination {
        group: String,
        face_value_cents: i64,
        reason: String,
    },

    /// Counted denominations do not add up to the asserted cash amount.
    #[error("Counted denominations total {counted}, but actual cash was given as {asserted}")]
    DenominationMismatch { asserted: Money, counted: Money },
}

impl ValidationError {
    /// Creates a Required error for the given field.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    /// Creates an InvalidAmount error.
    pub fn invalid_amount(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidAmount {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
