use expense_core::{
    ErrorKind, ExpenseRepository, ExpenseStore, ExpenseTracker, NewExpense, RepoError,
    SqliteExpenseRepository, StorageConfig, StorageDriver,
};
use serde_json::json;

const POISON_TRIGGER_SQL: &str = "CREATE TRIGGER reject_poison
BEFORE INSERT ON expenses
WHEN NEW.name = 'Poison'
BEGIN
    SELECT RAISE(ABORT, 'poisoned expense');
END;";

#[test]
fn failed_operation_rolls_back_nested_writes() {
    let repo = SqliteExpenseRepository::open_in_memory().unwrap();

    let result: Result<(), RepoError> = repo.transacting(|inner| {
        inner.add(&[NewExpense::new("Lamp", 10.0)])?;
        assert_eq!(inner.list()?.len(), 1);
        Err(RepoError::InvalidData("forced".to_string()))
    });

    assert!(matches!(result, Err(RepoError::InvalidData(_))));
    assert!(repo.list().unwrap().is_empty());
    assert!(repo.connection().is_autocommit());
}

#[test]
fn successful_operation_commits_every_write() {
    let repo = SqliteExpenseRepository::open_in_memory().unwrap();

    let added: Result<usize, RepoError> = repo.transacting(|inner| {
        inner.add(&[NewExpense::new("Lamp", 10.0)])?;
        inner.add(&[NewExpense::new("Desk", 20.0)])?;
        Ok(inner.list()?.len())
    });

    assert_eq!(added.unwrap(), 2);
    assert_eq!(repo.list().unwrap().len(), 2);
}

#[test]
fn storage_failure_mid_batch_stores_nothing() {
    let repo = SqliteExpenseRepository::open_in_memory().unwrap();
    repo.connection().execute_batch(POISON_TRIGGER_SQL).unwrap();
    let tracker = ExpenseTracker::new(repo);

    let err = tracker
        .add_expenses(&[
            json!({"name": "Lamp", "price": 10}),
            json!({"name": "Poison", "price": 1}),
            json!({"name": "Desk", "price": 20}),
        ])
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Storage);
    assert!(tracker.get_expenses().unwrap().is_empty());
}

#[test]
fn file_database_keeps_records_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("expenses.db");

    let added = {
        let tracker = ExpenseTracker::new(SqliteExpenseRepository::open(&path).unwrap());
        tracker
            .add_expenses(&[
                json!({"name": "Lamp", "price": 10}),
                json!({"name": "Desk", "price": 20.25}),
            ])
            .unwrap()
    };

    let store = ExpenseStore::open(&StorageConfig::sqlite(Some(path))).unwrap();
    assert_eq!(store.driver(), StorageDriver::Sqlite);

    let tracker = ExpenseTracker::new(store);
    assert_eq!(tracker.get_expenses().unwrap(), added);
}

#[test]
fn tokens_are_fixed_length_hex() {
    let repo = SqliteExpenseRepository::open_in_memory().unwrap();
    let added = repo.add(&[NewExpense::new("Lamp", 10.0)]).unwrap();

    let token = added[0].id.as_token().unwrap();
    assert_eq!(token.len(), 32);
    assert!(token
        .bytes()
        .all(|byte| byte.is_ascii_digit() || (b'a'..=b'f').contains(&byte)));
}
