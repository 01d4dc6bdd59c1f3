//! Ordered schema steps for the todo database.
//!
//! # Invariants
//! - Step versions start at 1 and increase by one.
//! - All pending steps commit together or not at all.
//! - A file that is rejected is left exactly as it was found.

use crate::db::{DbError, DbResult};
use log::info;
use rusqlite::{Connection, TransactionBehavior};

struct Step {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

/// Columns every `todos` table must carry, whoever created it.
const TODOS_COLUMNS: &[&str] = &[
    "id",
    "title",
    "description",
    "completed",
    "due_date",
    "created_at",
    "updated_at",
];

const STEPS: &[Step] = &[Step {
    version: 1,
    name: "init_todos",
    sql: include_str!("0001_init.sql"),
}];

/// Highest schema version this build can create and read.
pub fn latest_version() -> u32 {
    STEPS.iter().map(|step| step.version).max().unwrap_or(0)
}

/// Reads `PRAGMA user_version`.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}

/// Brings `conn` up to [`latest_version`].
///
/// Holds a write lock for the whole upgrade, so two processes opening the
/// same new file cannot both run step 1.
///
/// # Errors
/// - `SchemaTooNew` when the file is ahead of this build.
/// - `IncompatibleTable` when a `todos` table created elsewhere lacks a
///   required column.
/// - `Sqlite` when a step fails.
///
/// On any error the transaction is dropped uncommitted.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let found = schema_version(&tx)?;
    let supported = latest_version();
    if found > supported {
        return Err(DbError::SchemaTooNew { found, supported });
    }
    // `CREATE TABLE IF NOT EXISTS` keeps a foreign table as is, so it has to
    // be vetted before any step touches it.
    check_todos_columns(&tx, false)?;

    let pending = STEPS.iter().filter(|step| step.version > found);
    for step in pending {
        tx.execute_batch(step.sql)?;
        tx.pragma_update(None, "user_version", step.version)?;
        info!(
            "event=db_migrate module=db status=ok version={} name={}",
            step.version, step.name
        );
    }
    check_todos_columns(&tx, true)?;
    tx.commit()?;
    Ok(())
}

fn check_todos_columns(conn: &Connection, require_table: bool) -> DbResult<()> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('todos');")?;
    let present = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    if present.is_empty() && !require_table {
        return Ok(());
    }
    match TODOS_COLUMNS
        .iter()
        .copied()
        .find(|column| !present.iter().any(|name| name.as_str() == *column))
    {
        Some(column) => Err(DbError::IncompatibleTable { column }),
        None => Ok(()),
    }
}
