//! Expense domain model.
//!
//! # Responsibility
//! - Define the stored `Expense` record and its identifier.
//! - Define the add (`NewExpense`) and update (`ExpensePatch`) shapes.
//!
//! # Invariants
//! - `id` is assigned by a repository and never reassigned.
//! - Timestamps carry millisecond precision on every backend.
//! - `updated_at` never moves before `created_at`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

use super::query::FieldValue;

/// Repository-assigned expense identifier.
///
/// The in-memory backend hands out monotonic serial numbers, the SQLite
/// backend hands out opaque random tokens. Serialized untagged, so a serial
/// id is a JSON number and a token is a JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpenseId {
    /// Auto-incrementing integer, always >= 1.
    Serial(i64),
    /// Fixed-length lowercase hex token.
    Token(String),
}

impl ExpenseId {
    /// Generates a fresh random token id.
    pub fn generate_token() -> Self {
        Self::Token(Uuid::new_v4().simple().to_string())
    }

    pub fn as_serial(&self) -> Option<i64> {
        match self {
            Self::Serial(value) => Some(*value),
            Self::Token(_) => None,
        }
    }

    pub fn as_token(&self) -> Option<&str> {
        match self {
            Self::Serial(_) => None,
            Self::Token(value) => Some(value.as_str()),
        }
    }
}

impl Display for ExpenseId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serial(value) => write!(f, "{value}"),
            Self::Token(value) => write!(f, "{value}"),
        }
    }
}

impl From<i64> for ExpenseId {
    fn from(value: i64) -> Self {
        Self::Serial(value)
    }
}

/// Error returned when text cannot name an expense id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseExpenseIdError;

impl Display for ParseExpenseIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "expense id must not be blank")
    }
}

impl Error for ParseExpenseIdError {}

impl FromStr for ExpenseId {
    type Err = ParseExpenseIdError;

    /// Digit-only text becomes a serial id, anything else a token.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ParseExpenseIdError);
        }
        if trimmed.bytes().all(|byte| byte.is_ascii_digit()) {
            if let Ok(serial) = trimmed.parse::<i64>() {
                return Ok(Self::Serial(serial));
            }
        }
        Ok(Self::Token(trimmed.to_string()))
    }
}

/// Closed set of expense fields addressable by queries and updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExpenseField {
    Id,
    Name,
    Price,
    CreatedAt,
    UpdatedAt,
}

impl ExpenseField {
    pub const ALL: [Self; 5] = [
        Self::Id,
        Self::Name,
        Self::Price,
        Self::CreatedAt,
        Self::UpdatedAt,
    ];

    /// External field names, in declaration order.
    pub const NAMES: [&'static str; 5] = ["id", "name", "price", "createdAt", "updatedAt"];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Price => "price",
            Self::CreatedAt => "createdAt",
            Self::UpdatedAt => "updatedAt",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.as_str() == value)
    }

    /// Returns whether callers may change this field after creation.
    pub fn is_updatable(self) -> bool {
        matches!(self, Self::Name | Self::Price)
    }
}

impl Display for ExpenseField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical stored expense record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    pub id: ExpenseId,
    /// Non-empty display name.
    pub name: String,
    /// Finite, non-negative amount.
    pub price: f64,
    /// Set once at creation.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every successful mutation.
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    /// Builds a freshly stored record with both timestamps set to `now`.
    pub fn stored(id: ExpenseId, draft: &NewExpense, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: draft.name.clone(),
            price: draft.price,
            created_at: now,
            updated_at: now,
        }
    }

    /// Merges `patch` onto this record and refreshes `updated_at`.
    ///
    /// # Invariants
    /// - `id` and `created_at` are never touched.
    /// - `updated_at` is clamped so it never precedes `created_at`.
    pub fn apply(&mut self, patch: &ExpensePatch, now: DateTime<Utc>) {
        if let Some(name) = patch.name.as_ref() {
            self.name = name.clone();
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        self.updated_at = now.max(self.created_at);
    }

    /// Projects one field into its comparable value.
    pub fn field_value(&self, field: ExpenseField) -> FieldValue {
        match field {
            ExpenseField::Id => match &self.id {
                ExpenseId::Serial(value) => FieldValue::Serial(*value),
                ExpenseId::Token(value) => FieldValue::Token(value.clone()),
            },
            ExpenseField::Name => FieldValue::Text(self.name.clone()),
            ExpenseField::Price => FieldValue::Number(self.price),
            ExpenseField::CreatedAt => FieldValue::Timestamp(self.created_at),
            ExpenseField::UpdatedAt => FieldValue::Timestamp(self.updated_at),
        }
    }
}

/// Validated shape of an expense about to be added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpense {
    pub name: String,
    pub price: f64,
}

impl NewExpense {
    pub fn new(name: impl Into<String>, price: f64) -> Self {
        Self {
            name: name.into(),
            price,
        }
    }
}

/// Closed set of updatable fields; `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpensePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
}

impl ExpensePatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.price.is_none()
    }
}

/// Current time truncated to the millisecond precision every backend stores.
pub fn timestamp_now() -> DateTime<Utc> {
    truncate_to_millis(Utc::now())
}

pub fn truncate_to_millis(value: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(value.timestamp_millis()).unwrap_or(value)
}
