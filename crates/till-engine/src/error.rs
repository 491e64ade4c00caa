//! # Engine Error Types
//!
//! The single error type collaborators see.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Category          Variants                          Retry?            │
//! │  ───────────────   ───────────────────────────────   ──────            │
//! │  Validation        Validation                        never             │
//! │  State conflict    RegisterNotFound, RegisterClosed, never             │
//! │                    AlreadyClosed, RegisterAlreadyOpen                  │
//! │  Ledger rule       Core (totals out of range)        never             │
//! │  Configuration     InvalidConfig, ConfigLoadFailed   never             │
//! │  Persistence       Database                          if transient      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A retried write should first check whether the earlier attempt landed
//! (`Ledger::get`, `Ledger::find_by_order`).

use thiserror::Error;

use till_core::{CoreError, ValidationError};
use till_db::DbError;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine error type covering every failure of a public operation.
#[derive(Debug, Error)]
pub enum EngineError {
    // =========================================================================
    // Input
    // =========================================================================
    /// Input rejected before touching storage.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A ledger rule was violated.
    #[error(transparent)]
    Core(CoreError),

    // =========================================================================
    // State Conflicts
    // =========================================================================
    /// No register with this id in the scope.
    #[error("Register not found: {register_id}")]
    RegisterNotFound { register_id: String },

    /// The register is closed and accepts no movements.
    #[error("Register {register_id} is closed")]
    RegisterClosed { register_id: String },

    /// Close was requested for a register that is not open.
    #[error("Register {register_id} is already closed")]
    AlreadyClosed { register_id: String },

    /// The branch already has an open register.
    #[error("Branch {branch_id} already has an open register: {register_id}")]
    RegisterAlreadyOpen {
        branch_id: String,
        register_id: String,
    },

    // =========================================================================
    // Configuration
    // =========================================================================
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    // =========================================================================
    // Persistence
    // =========================================================================
    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(v) => EngineError::Validation(v),
            CoreError::InvalidRegisterStatus { register_id, .. } => {
                EngineError::RegisterClosed { register_id }
            }
            other => EngineError::Core(other),
        }
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(err: sqlx::Error) -> Self {
        EngineError::Database(DbError::from(err))
    }
}

impl From<std::io::Error> for EngineError {
    fn from(err: std::io::Error) -> Self {
        EngineError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::ConfigLoadFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl EngineError {
    /// Returns true if the operation may succeed when retried.
    ///
    /// Only transient persistence failures qualify: busy/locked database,
    /// exhausted pool, lost connection.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Database(db) => db.is_transient(),
            _ => false,
        }
    }

    /// Returns true for register state conflicts.
    pub fn is_state_conflict(&self) -> bool {
        matches!(
            self,
            EngineError::RegisterNotFound { .. }
                | EngineError::RegisterClosed { .. }
                | EngineError::AlreadyClosed { .. }
                | EngineError::RegisterAlreadyOpen { .. }
        )
    }

    /// Returns true if the input itself was rejected.
    pub fn is_validation(&self) -> bool {
        matches!(self, EngineError::Validation(_))
    }

    pub(crate) fn not_found(register_id: &str) -> Self {
        EngineError::RegisterNotFound {
            register_id: register_id.to_string(),
        }
    }
}
