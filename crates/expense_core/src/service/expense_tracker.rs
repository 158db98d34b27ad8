//! Expense use-case service.
//!
//! # Responsibility
//! - Provide the get/add/search/update/delete entry points for callers.
//! - Validate raw records before they reach a repository.
//! - Translate repository outcomes into stable, caller-facing errors.
//!
//! # Invariants
//! - Every public operation runs in exactly one `transacting` scope.
//! - Input that fails validation never touches storage.
//! - Service layer remains storage-agnostic.

use crate::model::expense::{Expense, ExpenseField, ExpenseId, ExpensePatch, NewExpense};
use crate::model::query::ExpenseQuery;
use crate::repo::expense_repo::{ExpenseRepository, RepoError};
use crate::validation::{
    expense_patch_schema, expense_schema, query_schema, ValidationError, Validator,
};
use log::debug;
use once_cell::sync::Lazy;
use serde_json::{json, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

static EXPENSE_VALIDATOR: Lazy<Validator> = Lazy::new(|| Validator::with_schema(expense_schema()));
static PATCH_VALIDATOR: Lazy<Validator> =
    Lazy::new(|| Validator::with_schema(expense_patch_schema()));
static QUERY_VALIDATOR: Lazy<Validator> = Lazy::new(|| Validator::with_schema(query_schema()));

pub type TrackerResult<T> = Result<T, TrackerError>;

/// Records a lookup failed to find.
#[derive(Debug, Clone, PartialEq)]
pub enum MissingExpense {
    /// Every requested id that does not exist, in request order.
    Ids(Vec<ExpenseId>),
    /// Rendered query descriptor that matched nothing.
    Query(String),
}

impl Display for MissingExpense {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ids(ids) => {
                let listed = ids
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "Expenses with IDs ({listed}) do not exist")
            }
            Self::Query(query) => write!(f, "Expense not found with given query: {query}"),
        }
    }
}

/// Stable error category for mapping onto transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    MissingExpense,
    InvalidRequest,
    Storage,
}

/// Service error for expense use-cases.
#[derive(Debug)]
pub enum TrackerError {
    /// Input records violated their schema.
    Validation(ValidationError),
    /// Referenced records do not exist.
    MissingExpense(MissingExpense),
    /// Request shape is unusable before validation applies.
    InvalidRequest(String),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl TrackerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::MissingExpense(_) => ErrorKind::MissingExpense,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Repo(_) => ErrorKind::Storage,
        }
    }

    fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }
}

impl Display for TrackerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::MissingExpense(missing) => write!(f, "{missing}"),
            Self::InvalidRequest(message) => f.write_str(message),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TrackerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for TrackerError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for TrackerError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::MissingExpense(MissingExpense::Ids(vec![id])),
            other => Self::Repo(other),
        }
    }
}

/// Expense tracker facade over a repository implementation.
pub struct ExpenseTracker<R: ExpenseRepository> {
    repo: R,
}

impl<R: ExpenseRepository> ExpenseTracker<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn into_repository(self) -> R {
        self.repo
    }

    /// Returns every stored expense.
    pub fn get_expenses(&self) -> TrackerResult<Vec<Expense>> {
        self.repo
            .transacting(|repo| Ok::<_, TrackerError>(repo.list()?))
    }

    /// Validates and stores a batch of raw expense records.
    ///
    /// # Contract
    /// - Caller-supplied `id`, `createdAt` and `updatedAt` are checked for
    ///   shape and then discarded.
    /// - Either every record is stored or none is.
    pub fn add_expenses(&self, records: &[Value]) -> TrackerResult<Vec<Expense>> {
        if records.is_empty() {
            return Err(TrackerError::invalid_request(
                "List of expenses to add cannot be empty",
            ));
        }
        let drafts: Vec<NewExpense> = EXPENSE_VALIDATOR.parse_array(records)?;

        let stored = self.repo.transacting(|repo| repo.add(&drafts))?;
        debug!(
            "event=expenses_add module=service status=ok count={}",
            stored.len()
        );
        Ok(stored)
    }

    /// Returns the records for `ids`, failing when any id is absent.
    pub fn search_by_id(&self, ids: &[ExpenseId]) -> TrackerResult<Vec<Expense>> {
        if ids.is_empty() {
            return Err(TrackerError::invalid_request(
                "List of expense IDs to search cannot be empty",
            ));
        }
        self.repo.transacting(|repo| find_existing(repo, ids))
    }

    /// Returns every record where `key operator value` holds.
    ///
    /// # Errors
    /// - `Validation` when the descriptor is malformed; storage is not read.
    /// - `MissingExpense::Query` when nothing matches.
    pub fn search_by_query(
        &self,
        key: &str,
        operator: &str,
        value: Value,
    ) -> TrackerResult<Vec<Expense>> {
        let query: ExpenseQuery = QUERY_VALIDATOR.parse_object(&json!({
            "key": key,
            "operator": operator,
            "value": value,
        }))?;

        self.repo.transacting(|repo| -> TrackerResult<Vec<Expense>> {
            let found = repo.find_by(query.key, query.operator, &query.value)?;
            if found.is_empty() {
                return Err(TrackerError::MissingExpense(MissingExpense::Query(
                    query.to_string(),
                )));
            }
            Ok(found)
        })
    }

    /// Applies a partial update to one existing expense.
    ///
    /// # Contract
    /// - Existence is checked before the update data.
    /// - Only `name` and `price` may be changed.
    pub fn update_expense(&self, id: &ExpenseId, data: &Value) -> TrackerResult<Expense> {
        let updated = self.repo.transacting(|repo| {
            find_existing(repo, std::slice::from_ref(id))?;
            let patch = parse_patch(data)?;
            Ok::<_, TrackerError>(repo.update(id, &patch)?)
        })?;
        debug!("event=expense_update module=service status=ok id={id}");
        Ok(updated)
    }

    /// Deletes every expense in `ids`, failing without changes when any is absent.
    pub fn delete_expenses(&self, ids: &[ExpenseId]) -> TrackerResult<()> {
        if ids.is_empty() {
            return Err(TrackerError::invalid_request(
                "List of expense IDs to delete cannot be empty",
            ));
        }

        self.repo.transacting(|repo| {
            find_existing(repo, ids)?;
            Ok::<_, TrackerError>(repo.delete(ids)?)
        })?;
        debug!(
            "event=expenses_delete module=service status=ok count={}",
            ids.len()
        );
        Ok(())
    }

    /// Removes every expense.
    pub fn clear_expenses(&self) -> TrackerResult<()> {
        self.repo.transacting(|repo| Ok::<_, TrackerError>(repo.clear()?))?;
        debug!("event=expenses_clear module=service status=ok");
        Ok(())
    }
}

fn find_existing<R: ExpenseRepository>(repo: &R, ids: &[ExpenseId]) -> TrackerResult<Vec<Expense>> {
    let found = repo.get(ids)?;
    let mut missing: Vec<ExpenseId> = Vec::new();
    for id in ids {
        if !found.iter().any(|expense| &expense.id == id) && !missing.contains(id) {
            missing.push(id.clone());
        }
    }

    if missing.is_empty() {
        Ok(found)
    } else {
        Err(TrackerError::MissingExpense(MissingExpense::Ids(missing)))
    }
}

fn parse_patch(data: &Value) -> TrackerResult<ExpensePatch> {
    let keys = match data.as_object() {
        Some(object) if !object.is_empty() => object.keys().map(String::as_str).collect::<Vec<_>>(),
        _ => {
            return Err(TrackerError::invalid_request(
                "Specify one or more allowed key-value pairs to update the expense",
            ))
        }
    };

    let mut unrecognized: Vec<&str> = keys
        .into_iter()
        .filter(|key| !ExpenseField::parse(key).is_some_and(ExpenseField::is_updatable))
        .collect();
    if !unrecognized.is_empty() {
        unrecognized.sort_unstable();
        return Err(TrackerError::InvalidRequest(format!(
            "Unrecognized key-value pairs ({}) used to update the expense",
            unrecognized.join(", ")
        )));
    }

    Ok(PATCH_VALIDATOR.parse_object(data)?)
}
