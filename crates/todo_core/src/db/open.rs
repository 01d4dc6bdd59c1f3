//! Opening todo databases.
//!
//! `open_db` is the bootstrap path: it may create the directory and file and
//! it runs migrations. `connect` is the per-operation path: it only attaches
//! to a file that bootstrap already prepared.

use super::migrations::apply_migrations;
use super::{DbError, DbResult};
use log::{error, info};
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::time::{Duration, Instant};

/// How long a statement waits on another writer's lock before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Creates `path` (and its parent directory) when missing, then migrates it.
///
/// Logs one `db_open` event with the outcome and duration.
pub fn open_db(path: impl AsRef<Path>) -> DbResult<Connection> {
    let path = path.as_ref();
    let started_at = Instant::now();

    let result = create_parent_dir(path).and_then(|()| {
        let mut conn = Connection::open(path)?;
        prepare(&mut conn)?;
        Ok(conn)
    });
    log_open("file", started_at, &result);
    result
}

/// Migrated private database that disappears with the connection.
pub fn open_db_in_memory() -> DbResult<Connection> {
    let started_at = Instant::now();
    let result = Connection::open_in_memory()
        .map_err(DbError::from)
        .and_then(|mut conn| {
            prepare(&mut conn)?;
            Ok(conn)
        });
    log_open("memory", started_at, &result);
    result
}

/// Attaches to an existing, already migrated database file.
///
/// Never creates the file: if it vanished after bootstrap the caller gets an
/// error rather than a silently empty store.
pub fn connect(path: impl AsRef<Path>) -> DbResult<Connection> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_URI
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let conn = Connection::open_with_flags(path, flags)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

fn prepare(conn: &mut Connection) -> DbResult<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_migrations(conn)
}

fn create_parent_dir(path: &Path) -> DbResult<()> {
    let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) else {
        return Ok(());
    };
    std::fs::create_dir_all(dir).map_err(|source| DbError::CreateDir {
        dir: dir.to_path_buf(),
        source,
    })
}

fn log_open(mode: &str, started_at: Instant, result: &DbResult<Connection>) {
    let duration_ms = started_at.elapsed().as_millis();
    match result {
        Ok(_) => info!("event=db_open module=db status=ok mode={mode} duration_ms={duration_ms}"),
        Err(err) => error!(
            "event=db_open module=db status=error mode={mode} duration_ms={duration_ms} error={err}"
        ),
    }
}
