//! Todo use-case service.
//!
//! # Responsibility
//! - Provide the CRUD + list entry points request handlers call.
//! - Turn raw list parameters into validated queries.
//! - Emit one metadata-only log event per call.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - Service layer remains storage-agnostic.
//! - Titles and descriptions never appear in log lines.

use crate::model::todo::{Todo, TodoDraft, TodoId, TodoPatch};
use crate::query::{ListParams, PageConfig, TodoListQuery, TodoPage};
use crate::repo::todo_repo::{RepoError, RepoResult, TodoRepository};
use log::{debug, error, info, warn};
use std::time::Instant;

/// Use-case service wrapper for todo operations.
pub struct TodoService<R: TodoRepository> {
    repo: R,
    page: PageConfig,
}

impl<R: TodoRepository> TodoService<R> {
    /// Creates a service with the default page-size policy.
    pub fn new(repo: R) -> Self {
        Self::with_page_config(repo, PageConfig::default())
    }

    /// Creates a service with an explicit page-size policy.
    pub fn with_page_config(repo: R, page: PageConfig) -> Self {
        Self { repo, page }
    }

    /// Borrows the underlying repository.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn page_config(&self) -> PageConfig {
        self.page
    }

    /// Creates a todo; `completed` defaults to `false`.
    pub fn create(&self, draft: &TodoDraft) -> RepoResult<Todo> {
        let started_at = Instant::now();
        let result = self.repo.create_todo(draft);
        log_outcome("todo_create", started_at, &result, |todo| {
            format!("id={}", todo.id)
        });
        result
    }

    pub fn get(&self, id: TodoId) -> RepoResult<Todo> {
        let started_at = Instant::now();
        let result = self.repo.get_todo(id);
        log_outcome("todo_get", started_at, &result, |todo| format!("id={}", todo.id));
        result
    }

    /// Lists todos from raw caller parameters.
    ///
    /// # Errors
    /// - `Validation` for non-positive `limit`, negative `offset` or unknown
    ///   sort tokens.
    pub fn list(&self, params: &ListParams) -> RepoResult<TodoPage> {
        let started_at = Instant::now();
        let result = TodoListQuery::from_params(params, &self.page)
            .map_err(RepoError::from)
            .and_then(|query| self.list_query(&query));
        log_outcome("todo_list", started_at, &result, |page| {
            format!(
                "total={} returned={} limit={} offset={}",
                page.total,
                page.items.len(),
                page.limit,
                page.offset
            )
        });
        result
    }

    /// Lists todos from an already validated query.
    pub fn list_query(&self, query: &TodoListQuery) -> RepoResult<TodoPage> {
        self.repo.list_todos(query)
    }

    /// Replaces every mutable field of an existing todo.
    pub fn replace(&self, id: TodoId, draft: &TodoDraft) -> RepoResult<Todo> {
        let started_at = Instant::now();
        let result = self.repo.replace_todo(id, draft);
        log_outcome("todo_replace", started_at, &result, |todo| {
            format!("id={}", todo.id)
        });
        result
    }

    /// Applies only the fields present in `patch`.
    pub fn patch(&self, id: TodoId, patch: &TodoPatch) -> RepoResult<Todo> {
        let started_at = Instant::now();
        let result = self.repo.patch_todo(id, patch);
        log_outcome("todo_patch", started_at, &result, |todo| {
            format!("id={}", todo.id)
        });
        result
    }

    pub fn delete(&self, id: TodoId) -> RepoResult<()> {
        let started_at = Instant::now();
        let result = self.repo.delete_todo(id);
        log_outcome("todo_delete", started_at, &result, |_| format!("id={id}"));
        result
    }
}

fn log_outcome<T>(
    event: &str,
    started_at: Instant,
    result: &RepoResult<T>,
    describe: impl FnOnce(&T) -> String,
) {
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(value) => info!(
            "event={event} module=service status=ok duration_ms={duration_ms} {}",
            describe(value)
        ),
        Err(err @ (RepoError::Validation(_) | RepoError::NotFound(_))) => debug!(
            "event={event} module=service status=rejected duration_ms={duration_ms} error_code={}",
            err.code()
        ),
        Err(err @ RepoError::InvalidData(_)) => warn!(
            "event={event} module=service status=error duration_ms={duration_ms} error_code={} error={err}",
            err.code()
        ),
        Err(err @ RepoError::StorageUnavailable(_)) => error!(
            "event={event} module=service status=error duration_ms={duration_ms} error_code={} error={err}",
            err.code()
        ),
    }
}
