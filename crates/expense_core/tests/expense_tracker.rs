use expense_core::{
    ErrorKind, ExpenseId, ExpenseRepository, ExpenseTracker, InMemoryExpenseRepository,
    MissingExpense, SqliteExpenseRepository, TrackerError,
};
use serde_json::{json, Value};

macro_rules! tracker_contract {
    ($backend:ident, $make:expr, [$($case:ident),* $(,)?]) => {
        mod $backend {
            use super::*;

            $(
                #[test]
                fn $case() {
                    let tracker = ExpenseTracker::new($make);
                    super::$case(&tracker);
                }
            )*
        }
    };
}

tracker_contract!(
    memory,
    InMemoryExpenseRepository::new(),
    [
        added_expenses_appear_in_listing,
        empty_batch_is_rejected,
        invalid_records_reject_the_whole_batch,
        caller_ids_and_timestamps_are_ignored,
        search_by_id_reports_every_missing_id,
        search_by_query_matches_and_reports_misses,
        search_by_query_rejects_malformed_descriptors,
        update_rejects_empty_and_unknown_keys,
        update_missing_expense_fails_without_mutation,
        delete_twice_fails_the_second_time,
        delete_with_a_missing_id_deletes_nothing,
        whitespace_names_are_accepted,
        groceries_end_to_end,
    ]
);

tracker_contract!(
    sqlite,
    SqliteExpenseRepository::open_in_memory().unwrap(),
    [
        added_expenses_appear_in_listing,
        empty_batch_is_rejected,
        invalid_records_reject_the_whole_batch,
        caller_ids_and_timestamps_are_ignored,
        search_by_id_reports_every_missing_id,
        search_by_query_matches_and_reports_misses,
        search_by_query_rejects_malformed_descriptors,
        update_rejects_empty_and_unknown_keys,
        update_missing_expense_fails_without_mutation,
        delete_twice_fails_the_second_time,
        delete_with_a_missing_id_deletes_nothing,
        whitespace_names_are_accepted,
        groceries_end_to_end,
    ]
);

fn missing_id() -> ExpenseId {
    ExpenseId::Serial(999_999)
}

fn records() -> Vec<Value> {
    vec![
        json!({"name": "Lamp", "price": 40}),
        json!({"name": "Desk", "price": 250.5}),
    ]
}

fn added_expenses_appear_in_listing<R: ExpenseRepository>(tracker: &ExpenseTracker<R>) {
    let before = tracker.get_expenses().unwrap();
    assert!(before.is_empty());

    let added = tracker.add_expenses(&records()).unwrap();
    assert_eq!(added.len(), 2);
    for expense in &added {
        assert_eq!(expense.created_at, expense.updated_at);
    }

    let listed = tracker.get_expenses().unwrap();
    assert_eq!(listed, added);
}

fn empty_batch_is_rejected<R: ExpenseRepository>(tracker: &ExpenseTracker<R>) {
    let err = tracker.add_expenses(&[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    assert_eq!(err.to_string(), "List of expenses to add cannot be empty");
}

fn invalid_records_reject_the_whole_batch<R: ExpenseRepository>(tracker: &ExpenseTracker<R>) {
    let err = tracker
        .add_expenses(&[
            json!({"name": "Lamp", "price": 40}),
            json!({"name": "", "price": -1}),
        ])
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    let message = err.to_string();
    assert!(message.contains("[1] Expense name must not be empty"));
    assert!(message.contains("[1] Expense price must be greater than or equal to zero"));
    assert!(tracker.get_expenses().unwrap().is_empty());
}

fn caller_ids_and_timestamps_are_ignored<R: ExpenseRepository>(tracker: &ExpenseTracker<R>) {
    let added = tracker
        .add_expenses(&[json!({
            "id": 4242,
            "name": "Chair",
            "price": 12,
            "createdAt": "2001-01-01T00:00:00Z",
            "updatedAt": "2001-01-01T00:00:00Z",
        })])
        .unwrap();

    assert_ne!(added[0].id, ExpenseId::Serial(4242));
    assert!(added[0].created_at.timestamp() > 978_307_200);
}

fn search_by_id_reports_every_missing_id<R: ExpenseRepository>(tracker: &ExpenseTracker<R>) {
    let added = tracker.add_expenses(&records()).unwrap();

    let found = tracker.search_by_id(&[added[1].id.clone()]).unwrap();
    assert_eq!(found, vec![added[1].clone()]);

    let other = ExpenseId::Serial(888_888);
    let err = tracker
        .search_by_id(&[added[0].id.clone(), missing_id(), other.clone()])
        .unwrap_err();
    match &err {
        TrackerError::MissingExpense(MissingExpense::Ids(ids)) => {
            assert_eq!(ids, &vec![missing_id(), other]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        err.to_string(),
        "Expenses with IDs (999999, 888888) do not exist"
    );

    let empty = tracker.search_by_id(&[]).unwrap_err();
    assert_eq!(empty.kind(), ErrorKind::InvalidRequest);
}

fn search_by_query_matches_and_reports_misses<R: ExpenseRepository>(tracker: &ExpenseTracker<R>) {
    tracker.add_expenses(&records()).unwrap();

    let found = tracker.search_by_query("price", ">=", json!(100)).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Desk");

    let err = tracker
        .search_by_query("price", "==", json!(500))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingExpense);
    assert_eq!(err.to_string(), "Expense not found with given query: price==500");
}

fn search_by_query_rejects_malformed_descriptors<R: ExpenseRepository>(
    tracker: &ExpenseTracker<R>,
) {
    let empty_key = tracker.search_by_query("", "==", json!(1)).unwrap_err();
    assert_eq!(empty_key.kind(), ErrorKind::Validation);
    assert_eq!(empty_key.to_string(), "Query key must not be empty");

    let empty_operator = tracker.search_by_query("price", "", json!(1)).unwrap_err();
    assert_eq!(empty_operator.to_string(), "Query operator must not be empty");

    let unknown_operator = tracker
        .search_by_query("price", "=~", json!(1))
        .unwrap_err();
    assert!(unknown_operator
        .to_string()
        .starts_with("Query operator must match regular expression: "));
}

fn update_rejects_empty_and_unknown_keys<R: ExpenseRepository>(tracker: &ExpenseTracker<R>) {
    let added = tracker.add_expenses(&records()).unwrap();
    let id = &added[0].id;

    let empty = tracker.update_expense(id, &json!({})).unwrap_err();
    assert_eq!(empty.kind(), ErrorKind::InvalidRequest);
    assert_eq!(
        empty.to_string(),
        "Specify one or more allowed key-value pairs to update the expense"
    );

    let unknown = tracker
        .update_expense(id, &json!({"key2": 1, "key1": 2, "price": 3}))
        .unwrap_err();
    assert_eq!(
        unknown.to_string(),
        "Unrecognized key-value pairs (key1, key2) used to update the expense"
    );

    let invalid = tracker
        .update_expense(id, &json!({"price": -3}))
        .unwrap_err();
    assert_eq!(invalid.kind(), ErrorKind::Validation);

    assert_eq!(tracker.search_by_id(&[id.clone()]).unwrap()[0], added[0]);
}

fn update_missing_expense_fails_without_mutation<R: ExpenseRepository>(
    tracker: &ExpenseTracker<R>,
) {
    let added = tracker.add_expenses(&records()).unwrap();

    let err = tracker
        .update_expense(&missing_id(), &json!({"price": 1}))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingExpense);
    assert_eq!(tracker.get_expenses().unwrap(), added);
}

fn delete_twice_fails_the_second_time<R: ExpenseRepository>(tracker: &ExpenseTracker<R>) {
    let added = tracker.add_expenses(&records()).unwrap();
    let ids = vec![added[0].id.clone()];

    tracker.delete_expenses(&ids).unwrap();
    let err = tracker.delete_expenses(&ids).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingExpense);
    assert_eq!(tracker.get_expenses().unwrap(), vec![added[1].clone()]);

    let empty = tracker.delete_expenses(&[]).unwrap_err();
    assert_eq!(
        empty.to_string(),
        "List of expense IDs to delete cannot be empty"
    );
}

fn delete_with_a_missing_id_deletes_nothing<R: ExpenseRepository>(tracker: &ExpenseTracker<R>) {
    let added = tracker.add_expenses(&records()).unwrap();

    let err = tracker
        .delete_expenses(&[added[0].id.clone(), missing_id()])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingExpense);
    assert_eq!(tracker.get_expenses().unwrap().len(), 2);

    tracker.clear_expenses().unwrap();
    assert!(tracker.get_expenses().unwrap().is_empty());
}

fn whitespace_names_are_accepted<R: ExpenseRepository>(tracker: &ExpenseTracker<R>) {
    let added = tracker
        .add_expenses(&[json!({"name": " ", "price": 1})])
        .unwrap();
    assert_eq!(added[0].name, " ");

    let updated = tracker
        .update_expense(&added[0].id, &json!({"name": "  "}))
        .unwrap();
    assert_eq!(updated.name, "  ");

    let empty = tracker
        .update_expense(&added[0].id, &json!({"name": ""}))
        .unwrap_err();
    assert_eq!(empty.kind(), ErrorKind::Validation);
}

fn groceries_end_to_end<R: ExpenseRepository>(tracker: &ExpenseTracker<R>) {
    let added = tracker
        .add_expenses(&[json!({"name": "Groceries", "price": 100})])
        .unwrap();
    let groceries = &added[0];
    assert_eq!(groceries.name, "Groceries");
    assert_eq!(groceries.price, 100.0);

    let found = tracker.search_by_query("price", ">=", json!(100)).unwrap();
    assert_eq!(found, added);

    let by_name = tracker
        .search_by_query("name", "==", json!("Groceries"))
        .unwrap();
    assert_eq!(by_name, added);

    let updated = tracker
        .update_expense(&groceries.id, &json!({"price": 50}))
        .unwrap();
    assert_eq!(updated.id, groceries.id);
    assert_eq!(updated.name, "Groceries");
    assert_eq!(updated.price, 50.0);
    assert_eq!(updated.created_at, groceries.created_at);
    assert!(updated.updated_at >= groceries.updated_at);

    let by_price = tracker.search_by_query("price", "<", json!("60")).unwrap();
    assert_eq!(by_price, vec![updated.clone()]);

    tracker.delete_expenses(&[groceries.id.clone()]).unwrap();
    let listed = tracker.get_expenses().unwrap();
    assert!(listed.iter().all(|expense| expense.id != groceries.id));
    let err = tracker.search_by_id(&[groceries.id.clone()]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::MissingExpense);
}
