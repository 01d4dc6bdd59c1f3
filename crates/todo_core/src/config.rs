//! Startup configuration read from environment variables.
//!
//! # Responsibility
//! - Select the storage backend and its parameters once per process.
//! - Carry page-size policy and logging settings to callers.
//!
//! # Invariants
//! - Unknown or malformed values are errors; nothing falls back silently.
//! - Empty variables count as unset.

use crate::logging::default_log_level;
use crate::query::{PageConfig, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_BACKEND: &str = "PERSISTENCE_BACKEND";
pub const ENV_SQLITE_PATH: &str = "SQLITE_DB_PATH";
pub const ENV_PAGE_SIZE_DEFAULT: &str = "TODO_PAGE_SIZE_DEFAULT";
pub const ENV_PAGE_SIZE_MAX: &str = "TODO_PAGE_SIZE_MAX";
pub const ENV_LOG_LEVEL: &str = "TODO_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "TODO_LOG_DIR";

pub const DEFAULT_SQLITE_PATH: &str = "./data/todos.db";

/// Which repository implementation to construct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Memory,
    Sqlite { path: PathBuf },
}

impl StorageConfig {
    /// Stable backend label used in logs.
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite { .. } => "sqlite",
        }
    }
}

/// Process-wide settings resolved at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub page: PageConfig,
    pub log_level: String,
    /// File logging is enabled only when set.
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    UnsupportedBackend(String),
    InvalidNumber { key: &'static str, value: String },
    PageSizeOrder { default_limit: u32, max_limit: u32 },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedBackend(value) => write!(
                f,
                "unsupported {ENV_BACKEND} `{value}`; expected memory|sqlite"
            ),
            Self::InvalidNumber { key, value } => {
                write!(f, "{key} must be a positive integer, got `{value}`")
            }
            Self::PageSizeOrder {
                default_limit,
                max_limit,
            } => write!(
                f,
                "{ENV_PAGE_SIZE_DEFAULT} ({default_limit}) must not exceed {ENV_PAGE_SIZE_MAX} ({max_limit})"
            ),
        }
    }
}

impl Error for ConfigError {}

impl AppConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, which maps a variable name to
    /// its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let storage = match read(ENV_BACKEND)
            .map(|value| value.to_ascii_lowercase())
            .as_deref()
        {
            None | Some("memory") => StorageConfig::Memory,
            Some("sqlite") => StorageConfig::Sqlite {
                path: PathBuf::from(
                    read(ENV_SQLITE_PATH).unwrap_or_else(|| DEFAULT_SQLITE_PATH.to_string()),
                ),
            },
            Some(other) => return Err(ConfigError::UnsupportedBackend(other.to_string())),
        };

        let default_limit = parse_positive(ENV_PAGE_SIZE_DEFAULT, read(ENV_PAGE_SIZE_DEFAULT))?
            .unwrap_or(DEFAULT_PAGE_LIMIT);
        let max_limit = parse_positive(ENV_PAGE_SIZE_MAX, read(ENV_PAGE_SIZE_MAX))?
            .unwrap_or(MAX_PAGE_LIMIT.max(default_limit));
        if default_limit > max_limit {
            return Err(ConfigError::PageSizeOrder {
                default_limit,
                max_limit,
            });
        }

        Ok(Self {
            storage,
            page: PageConfig {
                default_limit,
                max_limit,
            },
            log_level: read(ENV_LOG_LEVEL).unwrap_or_else(|| default_log_level().to_string()),
            log_dir: read(ENV_LOG_DIR).map(PathBuf::from),
        })
    }
}

fn parse_positive(key: &'static str, value: Option<String>) -> Result<Option<u32>, ConfigError> {
    match value {
        None => Ok(None),
        Some(value) => match value.parse::<u32>() {
            Ok(parsed) if parsed > 0 => Ok(Some(parsed)),
            _ => Err(ConfigError::InvalidNumber { key, value }),
        },
    }
}
