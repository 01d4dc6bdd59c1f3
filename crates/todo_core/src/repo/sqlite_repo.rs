//! SQLite-backed todo repository.
//!
//! # Responsibility
//! - Persist todos in the single `todos` table of one database file.
//! - Express the shared list algorithm (`TodoListQuery`) as SQL.
//!
//! # Invariants
//! - Each call opens its own connection and runs in one transaction.
//! - Writes use `BEGIN IMMEDIATE`, so read-modify-write is atomic.
//! - Read paths reject persisted rows that violate entity invariants.

use crate::clock::{system_clock, Clock};
use crate::db::{connect, open_db};
use crate::model::todo::{normalize_title, Todo, TodoDraft, TodoId, TodoPatch};
use crate::query::{TodoListQuery, TodoPage};
use crate::repo::todo_repo::{RepoError, RepoResult, TodoRepository};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const TODO_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    completed,
    due_date,
    created_at,
    updated_at
FROM todos";

/// Repository over one SQLite database file.
pub struct SqliteTodoRepository {
    path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl SqliteTodoRepository {
    /// Opens (creating when missing) the database at `path`, stamped by the
    /// system clock.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::open_with_clock(path, system_clock())
    }

    /// Opens the database at `path`, stamped by `clock`.
    ///
    /// # Errors
    /// `StorageUnavailable` when the file or its directory cannot be
    /// created or opened, when its schema is newer than supported, or when an
    /// existing `todos` table lacks a required column. A rejected file is not
    /// modified.
    pub fn open_with_clock(path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> RepoResult<Self> {
        let path = path.as_ref().to_path_buf();
        open_db(&path)?;
        Ok(Self { path, clock })
    }

    /// Database file backing this repository.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> RepoResult<Connection> {
        Ok(connect(&self.path)?)
    }
}

impl TodoRepository for SqliteTodoRepository {
    fn create_todo(&self, draft: &TodoDraft) -> RepoResult<Todo> {
        let draft = draft.normalized()?;

        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now_ms = self.clock.now_ms();
        tx.execute(
            "INSERT INTO todos (
                title,
                description,
                completed,
                due_date,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?5);",
            params![
                draft.title.as_str(),
                draft.description.as_deref(),
                bool_to_int(draft.completed),
                draft.due_date,
                now_ms,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        debug!("event=todo_create module=repo backend=sqlite status=ok id={id}");
        Ok(draft.into_todo(id, now_ms))
    }

    fn get_todo(&self, id: TodoId) -> RepoResult<Todo> {
        let conn = self.connect()?;
        load_todo(&conn, id)?.ok_or(RepoError::NotFound(id))
    }

    fn list_todos(&self, query: &TodoListQuery) -> RepoResult<TodoPage> {
        query.validate()?;

        let mut where_sql = String::from(" WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(completed) = query.completed {
            where_sql.push_str(" AND completed = ?");
            bind_values.push(Value::Integer(bool_to_int(completed)));
        }

        // `lower()` folds ASCII only, same as the in-memory matcher; `instr`
        // keeps `%` and `_` in the needle literal.
        if let Some(needle) = query.search_needle() {
            where_sql.push_str(
                " AND (instr(lower(title), ?) > 0
                    OR instr(lower(COALESCE(description, '')), ?) > 0)",
            );
            bind_values.push(Value::Text(needle.clone()));
            bind_values.push(Value::Text(needle));
        }

        let mut conn = self.connect()?;
        let tx = conn.transaction()?;

        let total: i64 = tx.query_row(
            &format!("SELECT COUNT(*) FROM todos{where_sql};"),
            params_from_iter(bind_values.iter()),
            |row| row.get(0),
        )?;

        let page_sql = format!(
            "{TODO_SELECT_SQL}{where_sql} ORDER BY {} {}, id ASC LIMIT ? OFFSET ?;",
            query.sort.column(),
            query.order.sql_keyword()
        );
        bind_values.push(Value::Integer(i64::from(query.limit)));
        bind_values.push(Value::Integer(i64::from(query.offset)));

        let mut items = Vec::new();
        {
            let mut stmt = tx.prepare(&page_sql)?;
            let mut rows = stmt.query(params_from_iter(bind_values.iter()))?;
            while let Some(row) = rows.next()? {
                items.push(parse_todo_row(row)?);
            }
        }
        tx.commit()?;

        Ok(TodoPage {
            items,
            total: u64::try_from(total).unwrap_or(0),
            limit: query.limit,
            offset: query.offset,
        })
    }

    fn replace_todo(&self, id: TodoId, draft: &TodoDraft) -> RepoResult<Todo> {
        let draft = draft.normalized()?;

        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut todo = load_todo(&tx, id)?.ok_or(RepoError::NotFound(id))?;
        todo.replace_with(&draft, self.clock.now_ms());
        write_todo(&tx, &todo)?;
        tx.commit()?;

        debug!("event=todo_replace module=repo backend=sqlite status=ok id={id}");
        Ok(todo)
    }

    fn patch_todo(&self, id: TodoId, patch: &TodoPatch) -> RepoResult<Todo> {
        let patch = patch.normalized()?;

        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut todo = load_todo(&tx, id)?.ok_or(RepoError::NotFound(id))?;
        patch.apply_to(&mut todo, self.clock.now_ms());
        write_todo(&tx, &todo)?;
        tx.commit()?;

        debug!("event=todo_patch module=repo backend=sqlite status=ok id={id}");
        Ok(todo)
    }

    fn delete_todo(&self, id: TodoId) -> RepoResult<()> {
        let mut conn = self.connect()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let changed = tx.execute("DELETE FROM todos WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        tx.commit()?;

        debug!("event=todo_delete module=repo backend=sqlite status=ok id={id}");
        Ok(())
    }
}

fn load_todo(conn: &Connection, id: TodoId) -> RepoResult<Option<Todo>> {
    let mut stmt = conn.prepare(&format!("{TODO_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_todo_row(row)?));
    }
    Ok(None)
}

fn write_todo(conn: &Connection, todo: &Todo) -> RepoResult<()> {
    let changed = conn.execute(
        "UPDATE todos
         SET
            title = ?1,
            description = ?2,
            completed = ?3,
            due_date = ?4,
            updated_at = ?5
         WHERE id = ?6;",
        params![
            todo.title.as_str(),
            todo.description.as_deref(),
            bool_to_int(todo.completed),
            todo.due_date,
            todo.updated_at,
            todo.id,
        ],
    )?;

    if changed == 0 {
        return Err(RepoError::NotFound(todo.id));
    }
    Ok(())
}

fn parse_todo_row(row: &Row<'_>) -> RepoResult<Todo> {
    let id: TodoId = row.get("id")?;

    let title: String = row.get("title")?;
    normalize_title(&title).map_err(|err| {
        RepoError::InvalidData(format!("todos.title for id {id} is invalid: {err}"))
    })?;

    let completed = match row.get::<_, i64>("completed")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid completed value `{other}` in todos.completed for id {id}"
            )));
        }
    };

    let created_at: i64 = row.get("created_at")?;
    let updated_at: i64 = row.get("updated_at")?;
    if updated_at < created_at {
        return Err(RepoError::InvalidData(format!(
            "todos.updated_at ({updated_at}) precedes created_at ({created_at}) for id {id}"
        )));
    }

    Ok(Todo {
        id,
        title,
        description: row.get("description")?,
        completed,
        due_date: row.get("due_date")?,
        created_at,
        updated_at,
    })
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
