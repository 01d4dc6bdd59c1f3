//! In-memory todo repository.
//!
//! # Responsibility
//! - Serve the full repository contract from process memory.
//! - Serialize every operation behind one instance-wide mutex.
//!
//! # Invariants
//! - Ids come from a counter that only grows; deleted ids are never reused.
//! - State lives only as long as the repository value.

use crate::clock::{system_clock, Clock};
use crate::model::todo::{Todo, TodoDraft, TodoId, TodoPatch};
use crate::query::{TodoListQuery, TodoPage};
use crate::repo::todo_repo::{RepoError, RepoResult, TodoRepository};
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct MemoryState {
    items: HashMap<TodoId, Todo>,
    next_id: TodoId,
}

impl Default for MemoryState {
    fn default() -> Self {
        Self {
            items: HashMap::new(),
            next_id: 1,
        }
    }
}

/// Map-backed repository guarded by a single lock.
pub struct InMemoryTodoRepository {
    state: Mutex<MemoryState>,
    clock: Arc<dyn Clock>,
}

impl Default for InMemoryTodoRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTodoRepository {
    /// Creates an empty repository stamped by the system clock.
    pub fn new() -> Self {
        Self::with_clock(system_clock())
    }

    /// Creates an empty repository stamped by `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            clock,
        }
    }

    /// Number of stored todos.
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panic while holding the lock cannot leave a half-written todo: every
    // mutation below builds the new value first and inserts it in one step.
    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TodoRepository for InMemoryTodoRepository {
    fn create_todo(&self, draft: &TodoDraft) -> RepoResult<Todo> {
        let draft = draft.normalized()?;

        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        let todo = draft.into_todo(id, self.clock.now_ms());
        state.items.insert(id, todo.clone());
        debug!("event=todo_create module=repo backend=memory status=ok id={id}");
        Ok(todo)
    }

    fn get_todo(&self, id: TodoId) -> RepoResult<Todo> {
        self.lock()
            .items
            .get(&id)
            .cloned()
            .ok_or(RepoError::NotFound(id))
    }

    fn list_todos(&self, query: &TodoListQuery) -> RepoResult<TodoPage> {
        query.validate()?;

        let state = self.lock();
        Ok(query.apply(state.items.values().cloned()))
    }

    fn replace_todo(&self, id: TodoId, draft: &TodoDraft) -> RepoResult<Todo> {
        let draft = draft.normalized()?;

        let mut state = self.lock();
        let existing = state.items.get(&id).ok_or(RepoError::NotFound(id))?;
        let mut updated = existing.clone();
        updated.replace_with(&draft, self.clock.now_ms());
        state.items.insert(id, updated.clone());
        debug!("event=todo_replace module=repo backend=memory status=ok id={id}");
        Ok(updated)
    }

    fn patch_todo(&self, id: TodoId, patch: &TodoPatch) -> RepoResult<Todo> {
        let patch = patch.normalized()?;

        let mut state = self.lock();
        let existing = state.items.get(&id).ok_or(RepoError::NotFound(id))?;
        let mut updated = existing.clone();
        patch.apply_to(&mut updated, self.clock.now_ms());
        state.items.insert(id, updated.clone());
        debug!("event=todo_patch module=repo backend=memory status=ok id={id}");
        Ok(updated)
    }

    fn delete_todo(&self, id: TodoId) -> RepoResult<()> {
        if self.lock().items.remove(&id).is_none() {
            return Err(RepoError::NotFound(id));
        }
        debug!("event=todo_delete module=repo backend=memory status=ok id={id}");
        Ok(())
    }
}
