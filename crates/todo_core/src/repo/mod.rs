//! Repository layer: storage contract and its two backends.
//!
//! # Responsibility
//! - Define the todo data access contract.
//! - Keep backend details (locking, SQL) out of service orchestration.
//!
//! # Invariants
//! - Write paths validate input before touching storage.
//! - Both backends return semantic errors (`Validation`, `NotFound`) in
//!   addition to storage failures, with identical observable results.

pub mod memory_repo;
pub mod sqlite_repo;
pub mod store;
pub mod todo_repo;
