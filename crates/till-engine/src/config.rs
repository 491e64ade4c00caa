//! # Engine Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Load order (later overrides earlier)                                  │
//! │                                                                         │
//! │  1. Defaults            EngineConfig::default()                        │
//! │  2. Config file         till.toml (explicit path or platform dir)      │
//! │  3. Environment         TILL_DB_PATH, TILL_DB_MAX_CONNECTIONS,         │
//! │                         TILL_ENFORCE_SINGLE_OPEN,                      │
//! │                         TILL_STRICT_DENOMINATIONS,                     │
//! │                         TILL_ADJUST_ON_DISCREPANCY                     │
//! │  4. validate()                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # till.toml
//! [database]
//! path = "till.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [registers]
//! enforce_single_open = true
//! default_name = "Register"
//!
//! [audit]
//! strict_denominations = false
//! adjust_on_discrepancy = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

use till_db::DbConfig;

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Database Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to the platform data directory.
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a writer waits for the write lock.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
}

/// `~/.local/share/till/till.db` and friends, or `./till.db`.
fn default_database_path() -> PathBuf {
    directories::ProjectDirs::from("com", "till", "till")
        .map(|dirs| dirs.data_dir().join("till.db"))
        .unwrap_or_else(|| PathBuf::from("till.db"))
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout() -> u64 {
    5_000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout(),
        }
    }
}

// =============================================================================
// Register Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterSettings {
    /// At most one open register per tenant/branch.
    #[serde(default = "default_true")]
    pub enforce_single_open: bool,

    /// Prefix of generated register names.
    #[serde(default = "default_register_name")]
    pub default_name: String,
}

fn default_true() -> bool {
    true
}

fn default_register_name() -> String {
    "Register".to_string()
}

impl Default for RegisterSettings {
    fn default() -> Self {
        RegisterSettings {
            enforce_single_open: true,
            default_name: default_register_name(),
        }
    }
}

// =============================================================================
// Audit Settings
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSettings {
    /// Reject audits whose breakdown does not add up to the stated cash.
    #[serde(default)]
    pub strict_denominations: bool,

    /// Feed audit differences back into the ledger as adjustments.
    #[serde(default = "default_true")]
    pub adjust_on_discrepancy: bool,
}

impl Default for AuditSettings {
    fn default() -> Self {
        AuditSettings {
            strict_denominations: false,
            adjust_on_discrepancy: true,
        }
    }
}

// =============================================================================
// Engine Configuration
// =============================================================================

/// Complete engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub registers: RegisterSettings,

    #[serde(default)]
    pub audit: AuditSettings,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    pub fn load(config_path: Option<PathBuf>) -> EngineResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading engine config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns defaults if loading fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load engine config, using defaults");
            Self::default()
        })
    }

    /// Parses a TOML document; missing sections take their defaults.
    pub fn from_toml(contents: &str) -> EngineResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> EngineResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(EngineError::InvalidConfig(
                "database.path must not be empty".into(),
            ));
        }

        if self.database.max_connections == 0 {
            return Err(EngineError::InvalidConfig(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.registers.default_name.trim().is_empty() {
            return Err(EngineError::InvalidConfig(
                "registers.default_name must not be empty".into(),
            ));
        }

        Ok(())
    }

    /// Pool configuration for `Database::new`.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
    }

    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies `TILL_*` overrides from any key/value source.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("TILL_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = lookup("TILL_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid TILL_DB_MAX_CONNECTIONS"),
            }
        }

        let flags: [(&str, &mut bool); 3] = [
            (
                "TILL_ENFORCE_SINGLE_OPEN",
                &mut self.registers.enforce_single_open,
            ),
            (
                "TILL_STRICT_DENOMINATIONS",
                &mut self.audit.strict_denominations,
            ),
            (
                "TILL_ADJUST_ON_DISCREPANCY",
                &mut self.audit.adjust_on_discrepancy,
            ),
        ];
        for (key, slot) in flags {
            if let Some(raw) = lookup(key) {
                match parse_flag(&raw) {
                    Some(value) => *slot = value,
                    None => warn!(key, value = %raw, "Ignoring invalid boolean override"),
                }
            }
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "till", "till")
            .map(|dirs| dirs.config_dir().join("till.toml"))
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
