//! SQLite-backed expense repository.
//!
//! # Responsibility
//! - Translate every repository operation into SQL over the `expenses` table.
//! - Map `transacting` onto SQLite transactions.
//!
//! # Invariants
//! - The owned connection is migrated and verified before first use.
//! - Ids are random tokens; serial ids never match a stored row.
//! - Timestamps are stored as epoch milliseconds.
//! - A `transacting` call inside an open transaction joins it.

use crate::db::migrations::latest_version;
use crate::db::{open_db, open_db_in_memory};
use crate::model::expense::{
    timestamp_now, Expense, ExpenseField, ExpenseId, ExpensePatch, NewExpense,
};
use crate::model::query::{resolve_operand, FieldValue, Operator};
use crate::repo::expense_repo::{ExpenseRepository, RepoError, RepoResult};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, Params, Row, Transaction, TransactionBehavior};
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;

const EXPENSE_SELECT_SQL: &str = "SELECT
    id,
    name,
    price,
    created_at,
    updated_at
FROM expenses";

const EXPENSE_COLUMNS: [&str; 5] = ["id", "name", "price", "created_at", "updated_at"];

/// Expense repository over an owned SQLite connection.
#[derive(Debug)]
pub struct SqliteExpenseRepository {
    conn: Connection,
}

impl SqliteExpenseRepository {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - Returns `UninitializedConnection` when migrations are not current.
    /// - Returns `MissingRequiredTable`/`MissingRequiredColumn` on schema drift.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_expense_connection_ready(&conn)?;
        Ok(Self { conn })
    }

    /// Opens a database file, migrating it if needed.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::try_new(open_db(path)?)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> RepoResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn into_connection(self) -> Connection {
        self.conn
    }

    fn query_expenses<P: Params>(&self, sql: &str, params: P) -> RepoResult<Vec<Expense>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut expenses = Vec::new();
        while let Some(row) = rows.next()? {
            expenses.push(parse_expense_row(row)?);
        }
        Ok(expenses)
    }

    fn load(&self, token: &str) -> RepoResult<Option<Expense>> {
        let mut found = self.query_expenses(
            &format!("{EXPENSE_SELECT_SQL} WHERE id = ?1;"),
            [token],
        )?;
        Ok(found.pop())
    }
}

impl ExpenseRepository for SqliteExpenseRepository {
    fn get(&self, ids: &[ExpenseId]) -> RepoResult<Vec<Expense>> {
        let tokens: BTreeSet<&str> = ids.iter().filter_map(ExpenseId::as_token).collect();
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; tokens.len()].join(", ");
        self.query_expenses(
            &format!("{EXPENSE_SELECT_SQL} WHERE id IN ({placeholders}) ORDER BY rowid ASC;"),
            params_from_iter(tokens),
        )
    }

    fn add(&self, items: &[NewExpense]) -> RepoResult<Vec<Expense>> {
        self.transacting(|repo| {
            let now = timestamp_now();
            let mut stored = Vec::with_capacity(items.len());
            for draft in items {
                let expense = Expense::stored(ExpenseId::generate_token(), draft, now);
                repo.conn.execute(
                    "INSERT INTO expenses (
                        id,
                        name,
                        price,
                        created_at,
                        updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5);",
                    params![
                        expense.id.to_string(),
                        expense.name.as_str(),
                        expense.price,
                        expense.created_at.timestamp_millis(),
                        expense.updated_at.timestamp_millis(),
                    ],
                )?;
                stored.push(expense);
            }
            Ok(stored)
        })
    }

    fn list(&self) -> RepoResult<Vec<Expense>> {
        self.query_expenses(&format!("{EXPENSE_SELECT_SQL} ORDER BY rowid ASC;"), [])
    }

    fn find_by(
        &self,
        field: ExpenseField,
        operator: Operator,
        value: &Value,
    ) -> RepoResult<Vec<Expense>> {
        let (clause, binds) = compile_predicate(field, operator, value);
        self.query_expenses(
            &format!("{EXPENSE_SELECT_SQL} WHERE {clause} ORDER BY rowid ASC;"),
            params_from_iter(binds),
        )
    }

    fn update(&self, id: &ExpenseId, patch: &ExpensePatch) -> RepoResult<Expense> {
        let Some(token) = id.as_token() else {
            return Err(RepoError::NotFound(id.clone()));
        };

        self.transacting(|repo| {
            let mut expense = repo
                .load(token)?
                .ok_or_else(|| RepoError::NotFound(id.clone()))?;
            expense.apply(patch, timestamp_now());
            repo.conn.execute(
                "UPDATE expenses
                 SET
                    name = ?2,
                    price = ?3,
                    updated_at = ?4
                 WHERE id = ?1;",
                params![
                    token,
                    expense.name.as_str(),
                    expense.price,
                    expense.updated_at.timestamp_millis(),
                ],
            )?;
            Ok(expense)
        })
    }

    fn delete(&self, ids: &[ExpenseId]) -> RepoResult<()> {
        let tokens: BTreeSet<&str> = ids.iter().filter_map(ExpenseId::as_token).collect();
        if tokens.is_empty() {
            return Ok(());
        }

        let placeholders = vec!["?"; tokens.len()].join(", ");
        self.conn.execute(
            &format!("DELETE FROM expenses WHERE id IN ({placeholders});"),
            params_from_iter(tokens),
        )?;
        Ok(())
    }

    fn clear(&self) -> RepoResult<()> {
        self.conn.execute("DELETE FROM expenses;", [])?;
        Ok(())
    }

    fn transacting<T, E, F>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce(&Self) -> Result<T, E>,
        E: From<RepoError>,
    {
        if !self.conn.is_autocommit() {
            return operation(self);
        }

        let tx = Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)
            .map_err(|err| E::from(RepoError::from(err)))?;
        match operation(self) {
            Ok(value) => {
                tx.commit().map_err(|err| E::from(RepoError::from(err)))?;
                Ok(value)
            }
            Err(err) => {
                match tx.rollback() {
                    Ok(()) => debug!("event=tx_rollback module=repo status=ok"),
                    Err(rollback_err) => warn!(
                        "event=tx_rollback module=repo status=error error={rollback_err}"
                    ),
                }
                Err(err)
            }
        }
    }
}

/// Compiles a query descriptor into a `WHERE` clause and its bind values.
///
/// Operands that cannot be compared with the column collapse into a constant
/// clause, matching the in-memory evaluation of the same descriptor.
fn compile_predicate(
    field: ExpenseField,
    operator: Operator,
    value: &Value,
) -> (String, Vec<SqlValue>) {
    let bind = match (field, resolve_operand(field, operator, value)) {
        (ExpenseField::Id, Some(FieldValue::Token(token))) => Some(SqlValue::Text(token)),
        (ExpenseField::Name, Some(FieldValue::Text(text))) => Some(SqlValue::Text(text)),
        (ExpenseField::Price, Some(FieldValue::Number(number))) => Some(SqlValue::Real(number)),
        (ExpenseField::CreatedAt | ExpenseField::UpdatedAt, Some(FieldValue::Timestamp(at))) => {
            Some(SqlValue::Integer(at.timestamp_millis()))
        }
        _ => None,
    };

    match bind {
        Some(bind) => (
            format!("{} {} ?1", column_name(field), operator.sql()),
            vec![bind],
        ),
        None if operator.holds(None) => ("1 = 1".to_string(), Vec::new()),
        None => ("1 = 0".to_string(), Vec::new()),
    }
}

fn column_name(field: ExpenseField) -> &'static str {
    match field {
        ExpenseField::Id => "id",
        ExpenseField::Name => "name",
        ExpenseField::Price => "price",
        ExpenseField::CreatedAt => "created_at",
        ExpenseField::UpdatedAt => "updated_at",
    }
}

fn parse_expense_row(row: &Row<'_>) -> RepoResult<Expense> {
    let id: String = row.get("id")?;
    let created_at = parse_millis(row.get("created_at")?, "expenses.created_at")?;
    let updated_at = parse_millis(row.get("updated_at")?, "expenses.updated_at")?;
    if updated_at < created_at {
        return Err(RepoError::InvalidData(format!(
            "expense `{id}` was updated before it was created"
        )));
    }

    let price: f64 = row.get("price")?;
    if !price.is_finite() || price < 0.0 {
        return Err(RepoError::InvalidData(format!(
            "invalid price `{price}` in expenses.price"
        )));
    }

    Ok(Expense {
        id: ExpenseId::Token(id),
        name: row.get("name")?,
        price,
        created_at,
        updated_at,
    })
}

fn parse_millis(value: i64, column: &'static str) -> RepoResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(value)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid timestamp `{value}` in {column}")))
}

fn ensure_expense_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    if !table_exists(conn, "expenses")? {
        return Err(RepoError::MissingRequiredTable("expenses"));
    }

    for column in EXPENSE_COLUMNS {
        if !table_has_column(conn, "expenses", column)? {
            return Err(RepoError::MissingRequiredColumn {
                table: "expenses",
                column,
            });
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
