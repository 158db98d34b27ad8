//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the storage contract the tracker depends on.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Both backends evaluate query descriptors with the same semantics.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

pub mod expense_repo;
pub mod memory;
pub mod sqlite;
pub mod store;

pub use expense_repo::{ExpenseRepository, RepoError, RepoResult};
pub use memory::InMemoryExpenseRepository;
pub use sqlite::SqliteExpenseRepository;
pub use store::ExpenseStore;
