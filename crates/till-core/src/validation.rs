//! # Validation Module
//!
//! Input validation for every engine entry point.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Collaborator (checkout, admin screens)                       │
//! │  └── Form-level checks, immediate feedback                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: till-engine                                                  │
//! │  └── THIS MODULE: scope, actor, amounts, text lengths                  │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  └── Foreign keys, UNIQUE(register_id, sequence)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use till_core::validation::{validate_actor, validate_scope};
//! use till_core::Scope;
//!
//! validate_scope(&Scope::new("tenant-1", "branch-1")).unwrap();
//! validate_actor("ana").unwrap();
//! assert!(validate_actor("  ").is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::Scope;
use crate::{MAX_AMOUNT_CENTS, MAX_DESCRIPTION_LENGTH, MAX_NAME_LENGTH, MAX_NOTES_LENGTH};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Identity Validators
// =============================================================================

/// Validates the tenant/branch scope.
///
/// ## Rules
/// - Both identifiers must be non-blank
pub fn validate_scope(scope: &Scope) -> ValidationResult<()> {
    validate_required("tenant_id", &scope.tenant_id)?;
    validate_required("branch_id", &scope.branch_id)
}

/// Validates the acting user's identity string.
pub fn validate_actor(actor: &str) -> ValidationResult<()> {
    validate_required("actor", actor)
}

/// Validates that an identifier field is present.
///
/// Format is not checked; an unknown id is a lookup miss, not bad input.
pub fn validate_required(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}

// =============================================================================
// Text Validators
// =============================================================================

/// Validates a register display name.
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_register_name;
///
/// assert!(validate_register_name("Front counter").is_ok());
/// assert!(validate_register_name("").is_err());
/// assert!(validate_register_name(&"A".repeat(200)).is_err());
/// ```
pub fn validate_register_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();
    validate_required("name", name)?;
    validate_max_len("name", name, MAX_NAME_LENGTH)?;
    Ok(name.to_string())
}

/// Validates a movement description. Empty is allowed.
pub fn validate_description(description: &str) -> ValidationResult<String> {
    let description = description.trim();
    validate_max_len("description", description, MAX_DESCRIPTION_LENGTH)?;
    Ok(description.to_string())
}

/// Validates an optional notes entry.
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<()> {
    match notes {
        Some(n) => validate_max_len("notes", n, MAX_NOTES_LENGTH),
        None => Ok(()),
    }
}

fn validate_max_len(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a movement amount as requested by the caller.
///
/// Any sign is accepted (the ledger normalizes it), but the magnitude must
/// not exceed [`MAX_AMOUNT_CENTS`].
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_movement_amount;
/// use till_core::Money;
///
/// assert!(validate_movement_amount(Money::from_cents(-2_000)).is_ok());
/// assert!(validate_movement_amount(Money::from_cents(i64::MAX)).is_err());
/// assert!(validate_movement_amount(Money::from_cents(i64::MIN)).is_err());
/// ```
pub fn validate_movement_amount(amount: Money) -> ValidationResult<()> {
    validate_amount_limit("amount", amount)
}

/// Rejects amounts whose magnitude exceeds [`MAX_AMOUNT_CENTS`].
pub fn validate_amount_limit(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.cents().unsigned_abs() > MAX_AMOUNT_CENTS.unsigned_abs() {
        return Err(ValidationError::invalid_amount(
            field,
            format!("must be at most {}", Money::from_cents(MAX_AMOUNT_CENTS)),
        ));
    }
    Ok(())
}

/// Validates the float counted into a register at open.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed (drawer starts empty)
/// - Must not exceed MAX_AMOUNT_CENTS
///
/// ## Example
/// ```rust
/// use till_core::validation::validate_initial_amount;
/// use till_core::Money;
///
/// assert!(validate_initial_amount(Money::from_cents(10_000)).is_ok());
/// assert!(validate_initial_amount(Money::zero()).is_ok());
/// assert!(validate_initial_amount(Money::from_cents(-1)).is_err());
/// ```
pub fn validate_initial_amount(amount: Money) -> ValidationResult<()> {
    validate_counted_amount("initial amount", amount)
}

/// Validates a counted closing balance.
pub fn validate_counted_balance(amount: Money) -> ValidationResult<()> {
    validate_counted_amount("actual balance", amount)
}

/// Validates physically counted cash: non-negative and within the limit.
pub fn validate_counted_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::invalid_amount(field, "must not be negative"));
    }
    validate_amount_limit(field, amount)
}

// =============================================================================
// Unit Tests
// =============================================================================
