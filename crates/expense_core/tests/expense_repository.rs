use chrono::SecondsFormat;
use expense_core::{
    Expense, ExpenseField, ExpenseId, ExpensePatch, ExpenseRepository, InMemoryExpenseRepository,
    NewExpense, Operator, RepoError, SqliteExpenseRepository,
};
use serde_json::{json, Value};

macro_rules! backend_contract {
    ($backend:ident, $make:expr, [$($case:ident),* $(,)?]) => {
        mod $backend {
            use super::*;

            $(
                #[test]
                fn $case() {
                    let repo = $make;
                    super::$case(&repo);
                }
            )*
        }
    };
}

backend_contract!(
    memory,
    InMemoryExpenseRepository::new(),
    [
        add_returns_records_in_input_order,
        list_contains_every_added_record,
        get_omits_unknown_ids,
        find_by_price_with_every_operator,
        strict_operators_do_not_coerce,
        find_by_name_id_and_timestamps,
        update_merges_patch_and_keeps_identity,
        update_unknown_id_returns_not_found,
        delete_ignores_unknown_ids,
        clear_removes_everything,
        transacting_returns_operation_error_unchanged,
    ]
);

backend_contract!(
    sqlite,
    SqliteExpenseRepository::open_in_memory().unwrap(),
    [
        add_returns_records_in_input_order,
        list_contains_every_added_record,
        get_omits_unknown_ids,
        find_by_price_with_every_operator,
        strict_operators_do_not_coerce,
        find_by_name_id_and_timestamps,
        update_merges_patch_and_keeps_identity,
        update_unknown_id_returns_not_found,
        delete_ignores_unknown_ids,
        clear_removes_everything,
        transacting_returns_operation_error_unchanged,
    ]
);

fn seed<R: ExpenseRepository>(repo: &R) -> Vec<Expense> {
    repo.add(&[
        NewExpense::new("Lamp", 100.0),
        NewExpense::new("Desk", 250.0),
        NewExpense::new("Couch", 500.0),
    ])
    .unwrap()
}

fn names(expenses: &[Expense]) -> Vec<&str> {
    expenses.iter().map(|expense| expense.name.as_str()).collect()
}

fn find_names<R: ExpenseRepository>(
    repo: &R,
    field: ExpenseField,
    operator: &str,
    value: Value,
) -> Vec<String> {
    let operator: Operator = operator.parse().unwrap();
    repo.find_by(field, operator, &value)
        .unwrap()
        .into_iter()
        .map(|expense| expense.name)
        .collect()
}

fn add_returns_records_in_input_order<R: ExpenseRepository>(repo: &R) {
    let stored = seed(repo);

    assert_eq!(names(&stored), vec!["Lamp", "Desk", "Couch"]);
    for expense in &stored {
        assert_eq!(expense.created_at, expense.updated_at);
    }
    assert_ne!(stored[0].id, stored[1].id);
    assert_ne!(stored[1].id, stored[2].id);
}

fn list_contains_every_added_record<R: ExpenseRepository>(repo: &R) {
    let stored = seed(repo);
    let more = repo.add(&[NewExpense::new("Rug", 0.0)]).unwrap();

    let listed = repo.list().unwrap();
    assert_eq!(listed.len(), 4);
    for expense in stored.iter().chain(more.iter()) {
        assert!(listed.contains(expense));
    }
}

fn get_omits_unknown_ids<R: ExpenseRepository>(repo: &R) {
    let stored = seed(repo);

    let found = repo
        .get(&[
            stored[2].id.clone(),
            ExpenseId::Serial(999_999),
            ExpenseId::Token("0".repeat(32)),
        ])
        .unwrap();
    assert_eq!(found, vec![stored[2].clone()]);
    assert!(repo.get(&[]).unwrap().is_empty());
}

fn find_by_price_with_every_operator<R: ExpenseRepository>(repo: &R) {
    seed(repo);
    let price = ExpenseField::Price;

    assert_eq!(find_names(repo, price, "===", json!(250)), vec!["Desk"]);
    assert_eq!(find_names(repo, price, "==", json!("250")), vec!["Desk"]);
    assert_eq!(find_names(repo, price, "=", json!(250)), vec!["Desk"]);
    assert_eq!(find_names(repo, price, "!==", json!(250)), vec!["Lamp", "Couch"]);
    assert_eq!(find_names(repo, price, "!=", json!(250)), vec!["Lamp", "Couch"]);
    assert_eq!(find_names(repo, price, "<>", json!("250")), vec!["Lamp", "Couch"]);
    assert_eq!(find_names(repo, price, ">", json!(100)), vec!["Desk", "Couch"]);
    assert_eq!(find_names(repo, price, "<", json!(500)), vec!["Lamp", "Desk"]);
    assert_eq!(find_names(repo, price, ">=", json!(250)), vec!["Desk", "Couch"]);
    assert_eq!(find_names(repo, price, "<=", json!("250")), vec!["Lamp", "Desk"]);
}

fn strict_operators_do_not_coerce<R: ExpenseRepository>(repo: &R) {
    seed(repo);
    let price = ExpenseField::Price;

    assert!(find_names(repo, price, "===", json!("250")).is_empty());
    assert_eq!(find_names(repo, price, "!==", json!("250")).len(), 3);
    assert!(find_names(repo, price, ">", json!("not a number")).is_empty());
    assert!(find_names(repo, ExpenseField::Name, "===", json!(100)).is_empty());
}

fn find_by_name_id_and_timestamps<R: ExpenseRepository>(repo: &R) {
    let stored = seed(repo);

    assert_eq!(
        find_names(repo, ExpenseField::Name, "==", json!("Desk")),
        vec!["Desk"]
    );
    assert_eq!(
        find_names(repo, ExpenseField::Name, "!=", json!("Desk")),
        vec!["Lamp", "Couch"]
    );

    let desk_id = serde_json::to_value(&stored[1].id).unwrap();
    assert_eq!(
        find_names(repo, ExpenseField::Id, "===", desk_id.clone()),
        vec!["Desk"]
    );
    assert_eq!(find_names(repo, ExpenseField::Id, "!=", desk_id).len(), 2);

    let created = stored[0]
        .created_at
        .to_rfc3339_opts(SecondsFormat::Millis, true);
    assert_eq!(
        find_names(repo, ExpenseField::CreatedAt, ">=", json!(created)).len(),
        3
    );
    assert!(find_names(repo, ExpenseField::UpdatedAt, "<", json!(0)).is_empty());
}

fn update_merges_patch_and_keeps_identity<R: ExpenseRepository>(repo: &R) {
    let stored = seed(repo);
    let patch = ExpensePatch {
        name: None,
        price: Some(50.0),
    };

    let updated = repo.update(&stored[0].id, &patch).unwrap();
    assert_eq!(updated.id, stored[0].id);
    assert_eq!(updated.name, "Lamp");
    assert_eq!(updated.price, 50.0);
    assert_eq!(updated.created_at, stored[0].created_at);
    assert!(updated.updated_at >= updated.created_at);

    let reloaded = repo.get(&[stored[0].id.clone()]).unwrap();
    assert_eq!(reloaded, vec![updated]);
}

fn update_unknown_id_returns_not_found<R: ExpenseRepository>(repo: &R) {
    seed(repo);
    let missing = ExpenseId::Serial(999_999);

    let err = repo
        .update(&missing, &ExpensePatch::default())
        .unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == missing));
}

fn delete_ignores_unknown_ids<R: ExpenseRepository>(repo: &R) {
    let stored = seed(repo);

    repo.delete(&[stored[1].id.clone(), ExpenseId::Serial(999_999)])
        .unwrap();
    assert_eq!(names(&repo.list().unwrap()), vec!["Lamp", "Couch"]);

    repo.delete(&[stored[1].id.clone()]).unwrap();
    assert_eq!(repo.list().unwrap().len(), 2);
}

fn clear_removes_everything<R: ExpenseRepository>(repo: &R) {
    seed(repo);

    repo.clear().unwrap();
    assert!(repo.list().unwrap().is_empty());
}

fn transacting_returns_operation_error_unchanged<R: ExpenseRepository>(repo: &R) {
    let result: Result<(), RepoError> =
        repo.transacting(|_| Err(RepoError::InvalidData("forced".to_string())));

    let err = result.unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(message) if message == "forced"));

    let value: Result<usize, RepoError> = repo.transacting(|inner| Ok(inner.list()?.len()));
    assert_eq!(value.unwrap(), 0);
}
