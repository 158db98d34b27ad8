//! Core domain logic for the expense tracker.
//! This crate is the single source of truth for expense invariants.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod validation;

pub use config::{ConfigError, CoreConfig, StorageConfig, StorageDriver};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::expense::{Expense, ExpenseField, ExpenseId, ExpensePatch, NewExpense};
pub use model::query::{ExpenseQuery, Operator};
pub use repo::{
    ExpenseRepository, ExpenseStore, InMemoryExpenseRepository, RepoError, RepoResult,
    SqliteExpenseRepository,
};
pub use service::{ErrorKind, ExpenseTracker, MissingExpense, TrackerError, TrackerResult};
pub use validation::{ValidationError, Validator};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
