//! Backend selection.
//!
//! # Responsibility
//! - Build the configured repository once at process start.
//! - Expose it as one concrete type callers can share by reference.

use crate::clock::{system_clock, Clock};
use crate::config::StorageConfig;
use crate::model::todo::{Todo, TodoDraft, TodoId, TodoPatch};
use crate::query::{TodoListQuery, TodoPage};
use crate::repo::memory_repo::InMemoryTodoRepository;
use crate::repo::sqlite_repo::SqliteTodoRepository;
use crate::repo::todo_repo::{RepoResult, TodoRepository};
use log::info;
use std::sync::Arc;

/// The repository chosen by configuration.
pub enum TodoStore {
    Memory(InMemoryTodoRepository),
    Sqlite(SqliteTodoRepository),
}

impl TodoStore {
    /// Stable backend label used in logs.
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory(_) => "memory",
            Self::Sqlite(_) => "sqlite",
        }
    }

    fn repo(&self) -> &dyn TodoRepository {
        match self {
            Self::Memory(repo) => repo,
            Self::Sqlite(repo) => repo,
        }
    }
}

/// Opens the repository described by `config` using the system clock.
pub fn open_store(config: &StorageConfig) -> RepoResult<TodoStore> {
    open_store_with_clock(config, system_clock())
}

/// Opens the repository described by `config` stamped by `clock`.
pub fn open_store_with_clock(config: &StorageConfig, clock: Arc<dyn Clock>) -> RepoResult<TodoStore> {
    let store = match config {
        StorageConfig::Memory => TodoStore::Memory(InMemoryTodoRepository::with_clock(clock)),
        StorageConfig::Sqlite { path } => {
            TodoStore::Sqlite(SqliteTodoRepository::open_with_clock(path, clock)?)
        }
    };
    info!(
        "event=store_open module=repo status=ok backend={}",
        store.backend_name()
    );
    Ok(store)
}

impl TodoRepository for TodoStore {
    fn create_todo(&self, draft: &TodoDraft) -> RepoResult<Todo> {
        self.repo().create_todo(draft)
    }

    fn get_todo(&self, id: TodoId) -> RepoResult<Todo> {
        self.repo().get_todo(id)
    }

    fn list_todos(&self, query: &TodoListQuery) -> RepoResult<TodoPage> {
        self.repo().list_todos(query)
    }

    fn replace_todo(&self, id: TodoId, draft: &TodoDraft) -> RepoResult<Todo> {
        self.repo().replace_todo(id, draft)
    }

    fn patch_todo(&self, id: TodoId, patch: &TodoPatch) -> RepoResult<Todo> {
        self.repo().patch_todo(id, patch)
    }

    fn delete_todo(&self, id: TodoId) -> RepoResult<()> {
        self.repo().delete_todo(id)
    }
}
