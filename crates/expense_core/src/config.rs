//! Runtime configuration for the expense core.
//!
//! # Responsibility
//! - Select the storage backend and its location.
//! - Carry logging preferences for hosts that bootstrap file logging.
//!
//! # Invariants
//! - Parsing is pure; nothing is opened or created here.
//! - Unset variables fall back to defaults, malformed ones are rejected.

use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::str::FromStr;

pub const DB_DRIVER_ENV: &str = "EXPENSE_DB_DRIVER";
pub const DB_PATH_ENV: &str = "EXPENSE_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "EXPENSE_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "EXPENSE_LOG_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    UnknownDriver(String),
    InvalidLogLevel(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownDriver(driver) => write!(f, "Unknown database driver: {driver}"),
            Self::InvalidLogLevel(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ConfigError {}

/// Storage backend selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageDriver {
    #[default]
    Memory,
    Sqlite,
}

impl StorageDriver {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
        }
    }
}

impl Display for StorageDriver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageDriver {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" | "sql" => Ok(Self::Sqlite),
            _ => Err(ConfigError::UnknownDriver(value.trim().to_string())),
        }
    }
}

/// Backend selection plus optional database file.
///
/// A SQLite driver without `db_path` opens a private in-memory database.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageConfig {
    pub driver: StorageDriver,
    pub db_path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn memory() -> Self {
        Self::default()
    }

    pub fn sqlite(db_path: Option<PathBuf>) -> Self {
        Self {
            driver: StorageDriver::Sqlite,
            db_path,
        }
    }
}

/// Full process configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub storage: StorageConfig,
    pub log_level: &'static str,
    /// File logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Reads configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through an arbitrary key lookup.
    ///
    /// Blank values are treated as unset.
    ///
    /// # Errors
    /// - `UnknownDriver` when the driver is not `memory`, `sqlite` or `sql`.
    /// - `InvalidLogLevel` when the level is not a known `log` level.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let driver = match read(DB_DRIVER_ENV) {
            Some(value) => value.parse()?,
            None => StorageDriver::default(),
        };
        let log_level = match read(LOG_LEVEL_ENV) {
            Some(value) => normalize_level(&value)
                .map_err(|err| ConfigError::InvalidLogLevel(err.to_string()))?,
            None => default_log_level(),
        };

        Ok(Self {
            storage: StorageConfig {
                driver,
                db_path: read(DB_PATH_ENV).map(|value| PathBuf::from(value.trim())),
            },
            log_level,
            log_dir: read(LOG_DIR_ENV).map(|value| PathBuf::from(value.trim())),
        })
    }
}
