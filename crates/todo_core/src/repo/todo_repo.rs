//! Todo repository contract and shared error type.
//!
//! # Responsibility
//! - Define the storage-agnostic CRUD + list contract.
//! - Provide semantic errors (`Validation`, `NotFound`) alongside storage
//!   failures.
//!
//! # Invariants
//! - Inputs are validated before any storage access.
//! - A failed call leaves stored state unchanged.

use crate::db::DbError;
use crate::model::todo::{Todo, TodoDraft, TodoId, TodoPatch, TodoValidationError};
use crate::query::{TodoListQuery, TodoPage};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by every backend.
#[derive(Debug)]
pub enum RepoError {
    /// Caller-fixable input problem.
    Validation(TodoValidationError),
    /// No live todo has the given id.
    NotFound(TodoId),
    /// The backing store could not be opened, read or written.
    StorageUnavailable(DbError),
    /// A persisted row violates entity invariants.
    InvalidData(String),
}

impl RepoError {
    /// Short stable label used in log lines and CLI output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::StorageUnavailable(_) => "storage_unavailable",
            Self::InvalidData(_) => "invalid_data",
        }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "todo not found: {id}"),
            Self::StorageUnavailable(err) => write!(f, "storage unavailable: {err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted todo data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::StorageUnavailable(err) => Some(err),
            Self::NotFound(_) => None,
            Self::InvalidData(_) => None,
        }
    }
}

impl From<TodoValidationError> for RepoError {
    fn from(value: TodoValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::StorageUnavailable(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::StorageUnavailable(DbError::Sqlite(value))
    }
}

/// Storage contract for todos.
///
/// Every implementation must yield the same fields, error kinds and ordering
/// for the same sequence of calls and the same clock readings.
pub trait TodoRepository: Send + Sync {
    /// Stores a new todo with a fresh id and `created_at == updated_at`.
    fn create_todo(&self, draft: &TodoDraft) -> RepoResult<Todo>;
    /// Returns the todo with `id`, or `NotFound`.
    fn get_todo(&self, id: TodoId) -> RepoResult<Todo>;
    /// Filters, sorts and slices todos; `total` counts all matches.
    fn list_todos(&self, query: &TodoListQuery) -> RepoResult<TodoPage>;
    /// Overwrites every mutable field of an existing todo.
    fn replace_todo(&self, id: TodoId, draft: &TodoDraft) -> RepoResult<Todo>;
    /// Applies only the supplied fields of `patch` to an existing todo.
    fn patch_todo(&self, id: TodoId, patch: &TodoPatch) -> RepoResult<Todo>;
    /// Permanently removes a todo.
    fn delete_todo(&self, id: TodoId) -> RepoResult<()>;
}
