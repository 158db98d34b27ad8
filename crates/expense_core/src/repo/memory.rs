//! In-memory expense repository.
//!
//! # Invariants
//! - Records are kept ordered by serial id.
//! - Serial ids start at 1 and are never handed out twice until `clear`.
//! - No concurrency control: the type is `!Sync`, callers serialize access.

use crate::model::expense::{
    timestamp_now, Expense, ExpenseField, ExpenseId, ExpensePatch, NewExpense,
};
use crate::model::query::{resolve_operand, Operator};
use crate::repo::expense_repo::{ExpenseRepository, RepoError, RepoResult};
use serde_json::Value;
use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};

/// Ordered in-memory expense collection keyed by serial id.
#[derive(Debug, Default)]
pub struct InMemoryExpenseRepository {
    items: RefCell<BTreeMap<i64, Expense>>,
    last_id: Cell<i64>,
}

impl InMemoryExpenseRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    fn next_id(&self) -> i64 {
        let next = self.last_id.get() + 1;
        self.last_id.set(next);
        next
    }
}

impl ExpenseRepository for InMemoryExpenseRepository {
    fn get(&self, ids: &[ExpenseId]) -> RepoResult<Vec<Expense>> {
        let wanted: BTreeSet<i64> = ids.iter().filter_map(ExpenseId::as_serial).collect();
        let items = self.items.borrow();
        Ok(wanted
            .iter()
            .filter_map(|id| items.get(id))
            .cloned()
            .collect())
    }

    fn add(&self, items: &[NewExpense]) -> RepoResult<Vec<Expense>> {
        let now = timestamp_now();
        let stored: Vec<Expense> = items
            .iter()
            .map(|draft| Expense::stored(ExpenseId::Serial(self.next_id()), draft, now))
            .collect();

        let mut collection = self.items.borrow_mut();
        for expense in &stored {
            if let ExpenseId::Serial(id) = expense.id {
                collection.insert(id, expense.clone());
            }
        }
        Ok(stored)
    }

    fn list(&self) -> RepoResult<Vec<Expense>> {
        Ok(self.items.borrow().values().cloned().collect())
    }

    fn find_by(
        &self,
        field: ExpenseField,
        operator: Operator,
        value: &Value,
    ) -> RepoResult<Vec<Expense>> {
        let operand = resolve_operand(field, operator, value);
        Ok(self
            .items
            .borrow()
            .values()
            .filter(|expense| {
                let ordering = operand
                    .as_ref()
                    .and_then(|operand| expense.field_value(field).compare(operand));
                operator.holds(ordering)
            })
            .cloned()
            .collect())
    }

    fn update(&self, id: &ExpenseId, patch: &ExpensePatch) -> RepoResult<Expense> {
        let mut items = self.items.borrow_mut();
        let expense = id
            .as_serial()
            .and_then(|serial| items.get_mut(&serial))
            .ok_or_else(|| RepoError::NotFound(id.clone()))?;
        expense.apply(patch, timestamp_now());
        Ok(expense.clone())
    }

    fn delete(&self, ids: &[ExpenseId]) -> RepoResult<()> {
        let mut items = self.items.borrow_mut();
        for serial in ids.iter().filter_map(ExpenseId::as_serial) {
            items.remove(&serial);
        }
        Ok(())
    }

    fn clear(&self) -> RepoResult<()> {
        self.items.borrow_mut().clear();
        self.last_id.set(0);
        Ok(())
    }

    /// Pass-through: in-memory mutations are immediately visible and there
    /// is nothing to roll back.
    fn transacting<T, E, F>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<RepoError>,
    {
        operation(self)
    }
}
