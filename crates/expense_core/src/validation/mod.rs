//! Declarative record validation.
//!
//! # Responsibility
//! - Check raw JSON records against a schema compiled once per process.
//! - Coerce valid records into their canonical typed shape.
//!
//! # Invariants
//! - Validation is pure: no storage access, no logging.
//! - Every violated field is reported in one `ValidationError`.
//! - Keys unknown to a schema are dropped from the canonical shape.

pub mod schemas;

use chrono::DateTime;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use schemas::{expense_patch_schema, expense_schema, query_schema};

/// Message reported when a batch has no elements.
pub const EMPTY_INPUT_MESSAGE: &str = "Input data must not be empty";

/// Aggregated validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    violations: Vec<String>,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            violations: vec![message.into()],
        }
    }

    pub fn from_violations(violations: Vec<String>) -> Self {
        Self { violations }
    }

    /// Individual violation messages, in schema field order.
    pub fn violations(&self) -> &[String] {
        &self.violations
    }
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.violations.join("; "))
    }
}

impl Error for ValidationError {}

/// One constraint applied to a present field value.
#[derive(Debug, Clone)]
pub enum Rule {
    /// String with at least one character.
    NonEmptyText { message: String },
    /// Number greater than or equal to `min`.
    MinNumber { min: f64, message: String },
    /// String fully matching `regex`.
    Pattern { regex: Regex, message: String },
    /// String equal to one of `allowed`.
    OneOf {
        allowed: &'static [&'static str],
        message: String,
    },
    /// Serial integer >= 1, or a string matching the token pattern.
    Identifier {
        token: Regex,
        token_message: String,
        serial_message: String,
    },
    /// RFC 3339 timestamp string.
    Timestamp,
    /// String or number.
    Scalar,
}

/// Field declaration inside a schema.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub key: &'static str,
    /// Human-readable name used in type and presence messages.
    pub label: &'static str,
    pub required: bool,
    pub rules: Vec<Rule>,
}

impl FieldSpec {
    pub fn required(key: &'static str, label: &'static str, rules: Vec<Rule>) -> Self {
        Self {
            key,
            label,
            required: true,
            rules,
        }
    }

    pub fn optional(key: &'static str, label: &'static str, rules: Vec<Rule>) -> Self {
        Self {
            key,
            label,
            required: false,
            rules,
        }
    }

    /// Returns the first violated rule message, if any.
    fn check(&self, value: &Value) -> Option<String> {
        self.rules
            .iter()
            .find_map(|rule| check_rule(self.label, rule, value))
    }
}

/// Named, ordered set of field declarations.
#[derive(Debug, Clone)]
pub struct Schema {
    /// Subject used when the record itself has the wrong shape.
    pub subject: &'static str,
    pub fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn new(subject: &'static str, fields: Vec<FieldSpec>) -> Self {
        Self { subject, fields }
    }

    pub fn knows(&self, key: &str) -> bool {
        self.fields.iter().any(|field| field.key == key)
    }
}

/// Schema-bound validator.
#[derive(Debug, Clone)]
pub struct Validator {
    schema: Schema,
}

impl Validator {
    pub fn with_schema(schema: Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Validates one record and returns it in canonical typed shape.
    ///
    /// # Errors
    /// - Returns every violated field constraint joined into one error.
    pub fn parse_object<T: DeserializeOwned>(&self, record: &Value) -> Result<T, ValidationError> {
        let canonical = self
            .canonicalize(record)
            .map_err(ValidationError::from_violations)?;
        self.deserialize(canonical)
            .map_err(ValidationError::new)
    }

    /// Validates a non-empty batch and returns records in input order.
    ///
    /// Violations are prefixed with the zero-based element index.
    ///
    /// # Errors
    /// - Returns `Input data must not be empty` for an empty batch.
    /// - Returns every violation across all elements otherwise.
    pub fn parse_array<T: DeserializeOwned>(
        &self,
        records: &[Value],
    ) -> Result<Vec<T>, ValidationError> {
        if records.is_empty() {
            return Err(ValidationError::new(EMPTY_INPUT_MESSAGE));
        }

        let mut parsed = Vec::with_capacity(records.len());
        let mut violations = Vec::new();
        for (index, record) in records.iter().enumerate() {
            let outcome = self
                .canonicalize(record)
                .and_then(|canonical| self.deserialize(canonical).map_err(|err| vec![err]));
            match outcome {
                Ok(value) => parsed.push(value),
                Err(found) => violations.extend(
                    found
                        .into_iter()
                        .map(|violation| format!("[{index}] {violation}")),
                ),
            }
        }

        if violations.is_empty() {
            Ok(parsed)
        } else {
            Err(ValidationError::from_violations(violations))
        }
    }

    fn canonicalize(&self, record: &Value) -> Result<Map<String, Value>, Vec<String>> {
        let Some(object) = record.as_object() else {
            return Err(vec![format!("{} must be an object", self.schema.subject)]);
        };

        let mut canonical = Map::new();
        let mut violations = Vec::new();
        for field in &self.schema.fields {
            match object.get(field.key) {
                None if field.required => violations.push(format!("{} is required", field.label)),
                None => {}
                Some(value) => match field.check(value) {
                    Some(violation) => violations.push(violation),
                    None => {
                        canonical.insert(field.key.to_string(), value.clone());
                    }
                },
            }
        }

        if violations.is_empty() {
            Ok(canonical)
        } else {
            Err(violations)
        }
    }

    fn deserialize<T: DeserializeOwned>(&self, canonical: Map<String, Value>) -> Result<T, String> {
        serde_json::from_value(Value::Object(canonical))
            .map_err(|err| format!("{} has an invalid shape: {err}", self.schema.subject))
    }
}

fn check_rule(label: &str, rule: &Rule, value: &Value) -> Option<String> {
    match rule {
        Rule::NonEmptyText { message } => match value.as_str() {
            None => Some(format!("{label} must be a string")),
            Some(text) if text.is_empty() => Some(message.clone()),
            Some(_) => None,
        },
        Rule::MinNumber { min, message } => match value.as_f64() {
            None => Some(format!("{label} must be a number")),
            Some(number) if !number.is_finite() || number < *min => Some(message.clone()),
            Some(_) => None,
        },
        Rule::Pattern { regex, message } => match value.as_str() {
            None => Some(format!("{label} must be a string")),
            Some(text) if !regex.is_match(text) => Some(message.clone()),
            Some(_) => None,
        },
        Rule::OneOf { allowed, message } => match value.as_str() {
            None => Some(format!("{label} must be a string")),
            Some(text) if !allowed.contains(&text) => Some(message.clone()),
            Some(_) => None,
        },
        Rule::Identifier {
            token,
            token_message,
            serial_message,
        } => match value {
            Value::Number(number) => match number.as_i64() {
                Some(serial) if serial >= 1 => None,
                _ => Some(serial_message.clone()),
            },
            Value::String(text) if token.is_match(text) => None,
            Value::String(_) => Some(token_message.clone()),
            _ => Some(format!("{label} must be a string or a number")),
        },
        Rule::Timestamp => match value.as_str() {
            Some(text) if DateTime::parse_from_rfc3339(text).is_ok() => None,
            _ => Some(format!("{label} must be an RFC 3339 timestamp")),
        },
        Rule::Scalar => match value {
            Value::String(_) | Value::Number(_) => None,
            _ => Some(format!("{label} must be a string or a number")),
        },
    }
}
