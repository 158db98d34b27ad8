//! Query descriptor vocabulary.
//!
//! # Responsibility
//! - Define the closed comparison operator set.
//! - Resolve a raw JSON query value into a typed operand for one field.
//!
//! # Invariants
//! - Every backend evaluates a descriptor through `resolve_operand` and
//!   `Operator::holds`, so both backends select the same records.
//! - An operand that cannot be compared satisfies only not-equal operators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use super::expense::{truncate_to_millis, ExpenseField, ExpenseId};

/// Closed comparison operator set, keyed by exact string tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "===")]
    StrictEqual,
    #[serde(rename = "==")]
    Equal,
    #[serde(rename = "=")]
    SqlEqual,
    #[serde(rename = "!==")]
    StrictNotEqual,
    #[serde(rename = "!=")]
    NotEqual,
    #[serde(rename = "<>")]
    SqlNotEqual,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = "<")]
    Less,
    #[serde(rename = ">=")]
    GreaterOrEqual,
    #[serde(rename = "<=")]
    LessOrEqual,
}

impl Operator {
    pub const ALL: [Self; 10] = [
        Self::StrictEqual,
        Self::Equal,
        Self::SqlEqual,
        Self::StrictNotEqual,
        Self::NotEqual,
        Self::SqlNotEqual,
        Self::Greater,
        Self::Less,
        Self::GreaterOrEqual,
        Self::LessOrEqual,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::StrictEqual => "===",
            Self::Equal => "==",
            Self::SqlEqual => "=",
            Self::StrictNotEqual => "!==",
            Self::NotEqual => "!=",
            Self::SqlNotEqual => "<>",
            Self::Greater => ">",
            Self::Less => "<",
            Self::GreaterOrEqual => ">=",
            Self::LessOrEqual => "<=",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|operator| operator.as_str() == token)
    }

    /// Strict operators never coerce the operand across types.
    pub fn is_strict(self) -> bool {
        matches!(self, Self::StrictEqual | Self::StrictNotEqual)
    }

    /// SQL spelling of the comparison.
    pub fn sql(self) -> &'static str {
        match self {
            Self::StrictEqual | Self::Equal | Self::SqlEqual => "=",
            Self::StrictNotEqual | Self::NotEqual | Self::SqlNotEqual => "<>",
            Self::Greater => ">",
            Self::Less => "<",
            Self::GreaterOrEqual => ">=",
            Self::LessOrEqual => "<=",
        }
    }

    /// Evaluates `stored <op> operand` from the result of comparing them.
    ///
    /// `None` means the two values are not comparable.
    pub fn holds(self, ordering: Option<Ordering>) -> bool {
        match self {
            Self::StrictEqual | Self::Equal | Self::SqlEqual => ordering == Some(Ordering::Equal),
            Self::StrictNotEqual | Self::NotEqual | Self::SqlNotEqual => {
                ordering != Some(Ordering::Equal)
            }
            Self::Greater => ordering == Some(Ordering::Greater),
            Self::Less => ordering == Some(Ordering::Less),
            Self::GreaterOrEqual => {
                matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
            }
            Self::LessOrEqual => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        Self::parse(token).ok_or_else(|| format!("unsupported query operator `{token}`"))
    }
}

/// Typed value of one expense field, or a resolved query operand.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Serial(i64),
    Token(String),
    Text(String),
    Number(f64),
    Timestamp(DateTime<Utc>),
}

impl FieldValue {
    /// Orders two values of the same kind; mixed kinds are incomparable.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Serial(left), Self::Serial(right)) => Some(left.cmp(right)),
            (Self::Token(left), Self::Token(right)) => Some(left.as_bytes().cmp(right.as_bytes())),
            (Self::Text(left), Self::Text(right)) => Some(left.as_bytes().cmp(right.as_bytes())),
            (Self::Number(left), Self::Number(right)) => left.partial_cmp(right),
            (Self::Timestamp(left), Self::Timestamp(right)) => Some(left.cmp(right)),
            _ => None,
        }
    }
}

/// Validated `(key, operator, value)` query descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseQuery {
    pub key: ExpenseField,
    pub operator: Operator,
    pub value: Value,
}

impl ExpenseQuery {
    /// Resolves this descriptor's value for its own field and operator.
    pub fn operand(&self) -> Option<FieldValue> {
        resolve_operand(self.key, self.operator, &self.value)
    }
}

impl Display for ExpenseQuery {
    /// Renders as `<key><operator><value>`, e.g. `price>=100`.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.key, self.operator)?;
        match &self.value {
            Value::String(text) => f.write_str(text),
            other => write!(f, "{other}"),
        }
    }
}

/// Resolves a raw query value into an operand comparable with `field`.
///
/// Strict operators accept only values already carrying the field's JSON
/// type. Other operators coerce numeric text, render numbers as text for
/// `name`, parse digit strings into serial ids and accept epoch milliseconds
/// for timestamps. Returns `None` when no operand can be produced.
pub fn resolve_operand(
    field: ExpenseField,
    operator: Operator,
    value: &Value,
) -> Option<FieldValue> {
    let strict = operator.is_strict();
    match field {
        ExpenseField::Id => match value {
            Value::Number(number) => integral(number, strict).map(FieldValue::Serial),
            Value::String(text) if strict => Some(FieldValue::Token(text.clone())),
            Value::String(text) => match text.parse::<ExpenseId>().ok()? {
                ExpenseId::Serial(serial) => Some(FieldValue::Serial(serial)),
                ExpenseId::Token(token) => Some(FieldValue::Token(token)),
            },
            _ => None,
        },
        ExpenseField::Name => match value {
            Value::String(text) => Some(FieldValue::Text(text.clone())),
            Value::Number(number) if !strict => Some(FieldValue::Text(number.to_string())),
            _ => None,
        },
        ExpenseField::Price => match value {
            Value::Number(number) => number.as_f64().map(FieldValue::Number),
            Value::String(text) if !strict => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|parsed| parsed.is_finite())
                .map(FieldValue::Number),
            _ => None,
        },
        ExpenseField::CreatedAt | ExpenseField::UpdatedAt => match value {
            Value::String(text) => DateTime::parse_from_rfc3339(text.trim())
                .ok()
                .map(|parsed| truncate_to_millis(parsed.with_timezone(&Utc)))
                .map(FieldValue::Timestamp),
            Value::Number(number) if !strict => integral(number, false)
                .and_then(DateTime::<Utc>::from_timestamp_millis)
                .map(FieldValue::Timestamp),
            _ => None,
        },
    }
}

fn integral(number: &serde_json::Number, strict: bool) -> Option<i64> {
    if let Some(value) = number.as_i64() {
        return Some(value);
    }
    if strict {
        return None;
    }
    number
        .as_f64()
        .filter(|value| value.fract() == 0.0 && value.abs() < i64::MAX as f64)
        .map(|value| value as i64)
}
