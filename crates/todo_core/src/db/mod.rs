//! SQLite file handling for the todo store.
//!
//! # Responsibility
//! - Open, configure and migrate database files.
//! - Translate driver and filesystem failures into one error type.
//!
//! # Invariants
//! - The schema version lives in `PRAGMA user_version`.
//! - A file is migrated before its first todo query.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod migrations;
mod open;

pub use open::{connect, open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure to reach or prepare a todo database.
#[derive(Debug)]
pub enum DbError {
    /// Driver-level failure (open, busy, constraint, I/O inside SQLite).
    Sqlite(rusqlite::Error),
    /// The directory that should hold the database file could not be created.
    CreateDir {
        dir: PathBuf,
        source: std::io::Error,
    },
    /// The file was written by a build with a newer schema.
    SchemaTooNew { found: u32, supported: u32 },
    /// An existing `todos` table lacks a column this build reads.
    IncompatibleTable { column: &'static str },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite: {err}"),
            Self::CreateDir { dir, source } => {
                write!(f, "cannot create directory `{}`: {source}", dir.display())
            }
            Self::SchemaTooNew { found, supported } => write!(
                f,
                "schema version {found} is newer than this build supports ({supported})"
            ),
            Self::IncompatibleTable { column } => {
                write!(f, "existing `todos` table has no `{column}` column")
            }
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::CreateDir { source, .. } => Some(source),
            Self::SchemaTooNew { .. } | Self::IncompatibleTable { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
