//! Schemas guarding the expense service boundary.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{FieldSpec, Rule, Schema};
use crate::model::expense::ExpenseField;

/// Pattern for repository-generated token ids.
pub const TOKEN_PATTERN: &str = r"^[0-9a-f]{32}$";
/// Pattern for the closed query operator set.
pub const OPERATOR_PATTERN: &str = r"^(===|!==|==|!=|<>|>=|<=|=|>|<)$";

static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(TOKEN_PATTERN).expect("valid token regex"));
static OPERATOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(OPERATOR_PATTERN).expect("valid operator regex"));

/// Schema for expense records entering the service.
///
/// `id` and timestamps are optional and only checked for shape; the
/// repository always assigns its own.
pub fn expense_schema() -> Schema {
    Schema::new(
        "Expense",
        vec![
            FieldSpec::optional(
                "id",
                "Expense ID",
                vec![Rule::Identifier {
                    token: TOKEN_RE.clone(),
                    token_message: format!(
                        "Expense ID must match regular expression: {TOKEN_PATTERN}"
                    ),
                    serial_message: "Expense ID must be greater or equal to 1".to_string(),
                }],
            ),
            name_field(true),
            price_field(true),
            FieldSpec::optional("createdAt", "Expense creation time", vec![Rule::Timestamp]),
            FieldSpec::optional("updatedAt", "Expense update time", vec![Rule::Timestamp]),
        ],
    )
}

/// Schema for partial updates; only updatable fields are declared.
pub fn expense_patch_schema() -> Schema {
    Schema::new("Expense update", vec![name_field(false), price_field(false)])
}

/// Schema for `(key, operator, value)` query descriptors.
pub fn query_schema() -> Schema {
    Schema::new(
        "Query",
        vec![
            FieldSpec::required(
                "key",
                "Query key",
                vec![
                    Rule::NonEmptyText {
                        message: "Query key must not be empty".to_string(),
                    },
                    Rule::OneOf {
                        allowed: &ExpenseField::NAMES,
                        message: format!(
                            "Query key must be one of: {}",
                            ExpenseField::NAMES.join(", ")
                        ),
                    },
                ],
            ),
            FieldSpec::required(
                "operator",
                "Query operator",
                vec![
                    Rule::NonEmptyText {
                        message: "Query operator must not be empty".to_string(),
                    },
                    Rule::Pattern {
                        regex: OPERATOR_RE.clone(),
                        message: format!(
                            "Query operator must match regular expression: {OPERATOR_PATTERN}"
                        ),
                    },
                ],
            ),
            FieldSpec::required("value", "Query value", vec![Rule::Scalar]),
        ],
    )
}

fn name_field(required: bool) -> FieldSpec {
    let rules = vec![Rule::NonEmptyText {
        message: "Expense name must not be empty".to_string(),
    }];
    if required {
        FieldSpec::required("name", "Expense name", rules)
    } else {
        FieldSpec::optional("name", "Expense name", rules)
    }
}

fn price_field(required: bool) -> FieldSpec {
    let rules = vec![Rule::MinNumber {
        min: 0.0,
        message: "Expense price must be greater than or equal to zero".to_string(),
    }];
    if required {
        FieldSpec::required("price", "Expense price", rules)
    } else {
        FieldSpec::optional("price", "Expense price", rules)
    }
}
