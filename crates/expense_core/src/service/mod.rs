//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate validation and repository calls into use-case level APIs.
//! - Keep callers decoupled from storage details.

pub mod expense_tracker;

pub use expense_tracker::{ErrorKind, ExpenseTracker, MissingExpense, TrackerError, TrackerResult};
