//! Domain model for todo storage.
//!
//! # Responsibility
//! - Define the canonical todo record shared by every backend.
//! - Keep create/replace/patch inputs as distinct types so their validation
//!   rules stay independent.
//!
//! # Invariants
//! - Every todo is identified by a repository-assigned `TodoId`.
//! - Deletion is a hard delete; there is no tombstone state.

pub mod todo;
