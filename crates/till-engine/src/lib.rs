//! # till-engine: Cash Register Engine
//!
//! Register lifecycle, movement ledger, balance summaries and audits for a
//! multi-tenant point of sale. Collaborators resolve the tenant/branch
//! [`Scope`] and the acting user, then call into [`CashEngine`].
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  checkout / admin screens                                              │
//! │       │  (scope, actor, request)                                       │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   till-engine (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │  CashEngine ──► RegisterManager   open / close / get / list     │   │
//! │  │             ──► Ledger            append / sale / refund        │   │
//! │  │             ──► BalanceCalculator summarize / verify / rebuild  │   │
//! │  │             ──► AuditEngine       perform_audit / history       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                        │                                        │
//! │       ▼                        ▼                                        │
//! │  till-core (math, types)   till-db (SQLite transactions)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use till_core::{Money, NewMovement, MovementType, OpenRegister, PaymentMethod, Scope};
//! use till_engine::{CashEngine, EngineConfig};
//!
//! let engine = CashEngine::connect(EngineConfig::load(None)?).await?;
//! let scope = Scope::new("tenant-1", "downtown");
//!
//! let register = engine
//!     .registers()
//!     .open(&scope, "ana", OpenRegister::new(Money::from_cents(10_000)))
//!     .await?;
//! engine
//!     .ledger()
//!     .append(&scope, "ana", NewMovement::new(
//!         &register.id, MovementType::Sale, Money::from_cents(5_000),
//!         PaymentMethod::Cash, "Walk-in sale",
//!     ))
//!     .await?;
//! let summary = engine.balances().summarize(&scope, &register.id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod audit;
pub mod balance;
pub mod config;
pub mod error;
pub mod ledger;
pub mod lifecycle;

#[cfg(test)]
mod scenarios;

// =============================================================================
// Re-exports
// =============================================================================

pub use audit::{AuditEngine, AuditRequest};
pub use balance::BalanceCalculator;
pub use config::{AuditSettings, DatabaseSettings, EngineConfig, RegisterSettings};
pub use error::{EngineError, EngineResult};
pub use ledger::{Ledger, OrderPayment};
pub use lifecycle::RegisterManager;

pub use till_core::Scope;

use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use till_db::{Database, DbConfig};

// =============================================================================
// Engine
// =============================================================================

/// Entry point owning the database handle and configuration.
///
/// Cheap to clone. Component handles borrow nothing, so they can be moved
/// into spawned tasks.
#[derive(Debug, Clone)]
pub struct CashEngine {
    db: Database,
    config: Arc<EngineConfig>,
}

impl CashEngine {
    /// Opens the configured database (running migrations) and builds the engine.
    pub async fn connect(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        if let Some(parent) = config.database.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Database::new(config.db_config()).await?;
        info!(path = %config.database.path.display(), "Cash engine ready");
        Ok(Self::new(db, config))
    }

    /// Builds the engine over an existing database handle.
    pub fn new(db: Database, config: EngineConfig) -> Self {
        CashEngine {
            db,
            config: Arc::new(config),
        }
    }

    /// Engine over a private in-memory database.
    pub async fn in_memory(config: EngineConfig) -> EngineResult<Self> {
        let db = Database::new(DbConfig::in_memory()).await?;
        Ok(Self::new(db, config))
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registers(&self) -> RegisterManager {
        RegisterManager::new(self.db.clone(), Arc::clone(&self.config))
    }

    pub fn ledger(&self) -> Ledger {
        Ledger::new(self.db.clone())
    }

    pub fn balances(&self) -> BalanceCalculator {
        BalanceCalculator::new(self.db.clone())
    }

    pub fn audits(&self) -> AuditEngine {
        AuditEngine::new(self.db.clone(), Arc::clone(&self.config))
    }
}

/// Installs the `tracing` subscriber for binaries.
///
/// `RUST_LOG` wins; otherwise `info,till=debug,sqlx=warn`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,till=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
