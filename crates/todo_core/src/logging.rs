//! Process logging bootstrap.
//!
//! # Responsibility
//! - Route `log` records for the todo service into size-rotated files.
//! - Turn panics into one sanitized `panic_captured` event.
//!
//! # Invariants
//! - At most one logger per process; a matching second call is a no-op.
//! - A call asking for another level or directory fails and changes nothing.
//! - Never panics.

use flexi_logger::{
    Cleanup, Criterion, FileSpec, LogSpecification, Logger, LoggerHandle, Naming, WriteMode,
};
use log::{error, info, LevelFilter};
use once_cell::sync::OnceCell;
use std::any::Any;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Once;

const LOG_BASENAME: &str = "todo_service";
const ROTATE_AT_BYTES: u64 = 8 * 1024 * 1024;
const KEEP_ROTATED_FILES: usize = 7;
const PANIC_TEXT_LIMIT: usize = 160;

static ACTIVE: OnceCell<ActiveLogger> = OnceCell::new();
static PANIC_HOOK: Once = Once::new();

struct ActiveLogger {
    status: LoggingStatus,
    _handle: LoggerHandle,
}

/// Level and directory of the running logger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingStatus {
    pub level: LevelFilter,
    pub log_dir: PathBuf,
}

/// Starts file logging at `level` under the absolute directory `log_dir`.
///
/// `level` is one of `off|error|warn|info|debug|trace`, case-insensitive;
/// `warning` is accepted for `warn`. SQLite driver records are capped at
/// `warn` whatever the level.
///
/// # Errors
/// Human-readable message when the level is unknown, the directory is
/// relative or cannot be created, the logger fails to start, or a logger with
/// different settings is already running.
pub fn init_logging(level: &str, log_dir: &Path) -> Result<(), String> {
    let requested = LoggingStatus {
        level: parse_level(level)?,
        log_dir: log_dir.to_path_buf(),
    };
    if !requested.log_dir.is_absolute() {
        return Err(format!(
            "log directory `{}` is not absolute",
            requested.log_dir.display()
        ));
    }

    let active = ACTIVE.get_or_try_init(|| start(&requested))?;
    if active.status == requested {
        return Ok(());
    }
    Err(format!(
        "logger already running with level={} dir=`{}`; cannot switch to level={} dir=`{}`",
        active.status.level,
        active.status.log_dir.display(),
        requested.level,
        requested.log_dir.display()
    ))
}

/// Settings of the running logger, if any.
pub fn logging_status() -> Option<LoggingStatus> {
    ACTIVE.get().map(|active| active.status.clone())
}

/// Level used when none is configured.
pub fn default_log_level() -> &'static str {
    if cfg!(debug_assertions) {
        "debug"
    } else {
        "info"
    }
}

fn start(requested: &LoggingStatus) -> Result<ActiveLogger, String> {
    let dir = requested.log_dir.as_path();
    std::fs::create_dir_all(dir)
        .map_err(|err| format!("cannot create log directory `{}`: {err}", dir.display()))?;

    let spec = LogSpecification::builder()
        .default(requested.level)
        .module("rusqlite", requested.level.min(LevelFilter::Warn))
        .build();

    let handle = Logger::with(spec)
        .log_to_file(FileSpec::default().directory(dir).basename(LOG_BASENAME))
        .rotate(
            Criterion::Size(ROTATE_AT_BYTES),
            Naming::Numbers,
            Cleanup::KeepLogFiles(KEEP_ROTATED_FILES),
        )
        .append()
        .write_mode(WriteMode::BufferAndFlush)
        .format_for_files(flexi_logger::detailed_format)
        .start()
        .map_err(|err| format!("logger did not start: {err}"))?;

    PANIC_HOOK.call_once(install_panic_hook);

    info!(
        "event=logging_init module=core status=ok level={} log_dir={} os={} version={}",
        requested.level,
        dir.display(),
        std::env::consts::OS,
        env!("CARGO_PKG_VERSION")
    );

    Ok(ActiveLogger {
        status: requested.clone(),
        _handle: handle,
    })
}

fn parse_level(raw: &str) -> Result<LevelFilter, String> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("warning") {
        return Ok(LevelFilter::Warn);
    }
    LevelFilter::from_str(trimmed).map_err(|_| {
        format!("unknown log level `{trimmed}`; use off|error|warn|info|debug|trace")
    })
}

fn install_panic_hook() {
    let chained = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let location = panic
            .location()
            .map_or_else(|| "unknown".to_string(), |at| format!("{}:{}", at.file(), at.line()));
        error!(
            "event=panic_captured module=core status=error location={} payload={}",
            location,
            one_line(&panic_text(panic.payload()), PANIC_TEXT_LIMIT)
        );
        chained(panic);
    }));
}

fn panic_text(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|text| (*text).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "<non-string payload>".to_string())
}

// Payloads can quote todo titles; keep them short and on one line.
fn one_line(text: &str, limit: usize) -> String {
    let mut flat: String = text
        .chars()
        .map(|ch| if ch == '\n' || ch == '\r' { ' ' } else { ch })
        .take(limit)
        .collect();
    if text.chars().count() > limit {
        flat.push_str("...");
    }
    flat
}
