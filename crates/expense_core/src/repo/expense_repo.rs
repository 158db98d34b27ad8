//! Expense repository contract.
//!
//! # Responsibility
//! - Define the storage-agnostic CRUD, query and transaction surface.
//! - Define the semantic and transport errors every backend reports.
//!
//! # Invariants
//! - Only repositories read or mutate the durable expense set.
//! - `add` assigns ids and timestamps; callers never choose them.
//! - Work run through `transacting` commits fully or not at all on
//!   backends that support transactions.

use crate::db::DbError;
use crate::model::expense::{Expense, ExpenseField, ExpenseId, ExpensePatch, NewExpense};
use crate::model::query::Operator;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for expense persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(ExpenseId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "expense not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted expense data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection is not migrated: expected schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table `{table}`"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "missing required column `{table}.{column}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage contract shared by every expense backend.
pub trait ExpenseRepository {
    /// Returns the existing records among `ids`; unknown ids are omitted.
    fn get(&self, ids: &[ExpenseId]) -> RepoResult<Vec<Expense>>;

    /// Stores `items` and returns the stored records in input order.
    fn add(&self, items: &[NewExpense]) -> RepoResult<Vec<Expense>>;

    fn list(&self) -> RepoResult<Vec<Expense>>;

    /// Returns every record where `record[field] operator value` holds.
    fn find_by(
        &self,
        field: ExpenseField,
        operator: Operator,
        value: &Value,
    ) -> RepoResult<Vec<Expense>>;

    /// Merges `patch` onto the record and refreshes `updated_at`.
    ///
    /// Returns `RepoError::NotFound` when `id` does not exist.
    fn update(&self, id: &ExpenseId, patch: &ExpensePatch) -> RepoResult<Expense>;

    /// Removes records; unknown ids are ignored.
    fn delete(&self, ids: &[ExpenseId]) -> RepoResult<()>;

    fn clear(&self) -> RepoResult<()>;

    /// Runs `operation` as one atomic unit of work.
    ///
    /// The operation's error is returned unchanged after the backend undoes
    /// its writes.
    fn transacting<T, E, F>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<RepoError>;
}
