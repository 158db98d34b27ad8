//! Expense database bootstrap.
//!
//! # Responsibility
//! - Open SQLite connections for `SqliteExpenseRepository`.
//! - Bring the `expenses` schema up to the version this binary ships.
//!
//! # Invariants
//! - The schema version lives in `PRAGMA user_version`.
//! - A connection is handed out only after every pending migration applied.
//! - A failed migration leaves the file at its previous version.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure while opening or migrating the expense database.
#[derive(Debug)]
pub enum DbError {
    /// Connection-level SQLite failure outside any migration.
    Sqlite(rusqlite::Error),
    /// The migration to `version` failed and was rolled back.
    Migration {
        version: u32,
        source: rusqlite::Error,
    },
    /// The file was written by a newer binary.
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl DbError {
    /// Schema version involved in the failure, when one is known.
    pub fn schema_version(&self) -> Option<u32> {
        match self {
            Self::Sqlite(_) => None,
            Self::Migration { version, .. } => Some(*version),
            Self::UnsupportedSchemaVersion { db_version, .. } => Some(*db_version),
        }
    }
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "expense database error: {err}"),
            Self::Migration { version, source } => {
                write!(f, "expense schema migration v{version} failed: {source}")
            }
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "expense database schema v{db_version} is newer than supported v{latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) | Self::Migration { source: err, .. } => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
