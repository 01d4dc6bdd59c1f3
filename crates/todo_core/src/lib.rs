//! Core storage logic for the todo service.
//! This crate is the single source of truth for todo invariants and for the
//! list semantics every storage backend must reproduce.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AppConfig, ConfigError, StorageConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingStatus};
pub use model::todo::{
    parse_due_date, Todo, TodoDraft, TodoId, TodoPatch, TodoValidationError,
};
pub use query::{ListParams, PageConfig, SortField, SortOrder, TodoListQuery, TodoPage};
pub use repo::memory_repo::InMemoryTodoRepository;
pub use repo::sqlite_repo::SqliteTodoRepository;
pub use repo::store::{open_store, open_store_with_clock, TodoStore};
pub use repo::todo_repo::{RepoError, RepoResult, TodoRepository};
pub use service::todo_service::TodoService;

/// Liveness check for front ends; touches no storage.
pub fn ping() -> &'static str {
    "pong"
}

/// Version of this library as built.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
