//! Runtime-selected expense storage.
//!
//! `ExpenseRepository::transacting` is generic, so backends are selected
//! through an enum instead of a trait object.

use crate::config::{StorageConfig, StorageDriver};
use crate::model::expense::{Expense, ExpenseField, ExpenseId, ExpensePatch, NewExpense};
use crate::model::query::Operator;
use crate::repo::expense_repo::{ExpenseRepository, RepoError, RepoResult};
use crate::repo::memory::InMemoryExpenseRepository;
use crate::repo::sqlite::SqliteExpenseRepository;
use log::info;
use serde_json::Value;

/// One of the supported backends, chosen from configuration.
#[derive(Debug)]
pub enum ExpenseStore {
    Memory(InMemoryExpenseRepository),
    Sqlite(SqliteExpenseRepository),
}

impl ExpenseStore {
    /// Opens the backend described by `config`.
    ///
    /// # Errors
    /// - Returns `RepoError::Db` when the SQLite database cannot be opened
    ///   or migrated.
    pub fn open(config: &StorageConfig) -> RepoResult<Self> {
        let store = match (config.driver, config.db_path.as_ref()) {
            (StorageDriver::Memory, _) => Self::Memory(InMemoryExpenseRepository::new()),
            (StorageDriver::Sqlite, Some(path)) => {
                Self::Sqlite(SqliteExpenseRepository::open(path)?)
            }
            (StorageDriver::Sqlite, None) => {
                Self::Sqlite(SqliteExpenseRepository::open_in_memory()?)
            }
        };
        info!(
            "event=store_open module=repo status=ok driver={}",
            store.driver()
        );
        Ok(store)
    }

    pub fn driver(&self) -> StorageDriver {
        match self {
            Self::Memory(_) => StorageDriver::Memory,
            Self::Sqlite(_) => StorageDriver::Sqlite,
        }
    }
}

impl From<InMemoryExpenseRepository> for ExpenseStore {
    fn from(value: InMemoryExpenseRepository) -> Self {
        Self::Memory(value)
    }
}

impl From<SqliteExpenseRepository> for ExpenseStore {
    fn from(value: SqliteExpenseRepository) -> Self {
        Self::Sqlite(value)
    }
}

impl ExpenseRepository for ExpenseStore {
    fn get(&self, ids: &[ExpenseId]) -> RepoResult<Vec<Expense>> {
        match self {
            Self::Memory(repo) => repo.get(ids),
            Self::Sqlite(repo) => repo.get(ids),
        }
    }

    fn add(&self, items: &[NewExpense]) -> RepoResult<Vec<Expense>> {
        match self {
            Self::Memory(repo) => repo.add(items),
            Self::Sqlite(repo) => repo.add(items),
        }
    }

    fn list(&self) -> RepoResult<Vec<Expense>> {
        match self {
            Self::Memory(repo) => repo.list(),
            Self::Sqlite(repo) => repo.list(),
        }
    }

    fn find_by(
        &self,
        field: ExpenseField,
        operator: Operator,
        value: &Value,
    ) -> RepoResult<Vec<Expense>> {
        match self {
            Self::Memory(repo) => repo.find_by(field, operator, value),
            Self::Sqlite(repo) => repo.find_by(field, operator, value),
        }
    }

    fn update(&self, id: &ExpenseId, patch: &ExpensePatch) -> RepoResult<Expense> {
        match self {
            Self::Memory(repo) => repo.update(id, patch),
            Self::Sqlite(repo) => repo.update(id, patch),
        }
    }

    fn delete(&self, ids: &[ExpenseId]) -> RepoResult<()> {
        match self {
            Self::Memory(repo) => repo.delete(ids),
            Self::Sqlite(repo) => repo.delete(ids),
        }
    }

    fn clear(&self) -> RepoResult<()> {
        match self {
            Self::Memory(repo) => repo.clear(),
            Self::Sqlite(repo) => repo.clear(),
        }
    }

    fn transacting<T, E, F>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<RepoError>,
    {
        match self {
            Self::Memory(repo) => repo.transacting(|_| operation(self)),
            Self::Sqlite(repo) => repo.transacting(|_| operation(self)),
        }
    }
}
