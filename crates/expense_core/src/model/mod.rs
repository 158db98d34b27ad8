//! Domain model for tracked expenses.
//!
//! # Responsibility
//! - Define the canonical expense record and its write-side shapes.
//! - Define the closed query vocabulary shared by every storage backend.
//!
//! # Invariants
//! - Every stored expense is identified by exactly one `ExpenseId`.
//! - `created_at <= updated_at` for every stored expense.

pub mod expense;
pub mod query;
