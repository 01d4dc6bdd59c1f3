//! Command-line front end over `todo_core`.
//!
//! # Responsibility
//! - Resolve configuration from the environment and open one store.
//! - Map each subcommand to one service call and print the result as JSON.
//!
//! Exit codes: 0 success, 2 validation, 3 not found, 1 anything else.

use clap::{Args, Parser, Subcommand};
use log::error;
use serde_json::{json, Value};
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use todo_core::{
    init_logging, open_store, parse_due_date, AppConfig, ConfigError, ListParams, RepoError,
    TodoDraft, TodoId, TodoPatch, TodoService, TodoStore,
};

#[derive(Debug, Parser)]
#[command(name = "todo_cli", version, about = "Manage todos in the configured store")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a todo
    Create(DraftArgs),
    /// Print one todo
    Get { id: TodoId },
    /// List todos with optional filters and paging
    List(ListArgs),
    /// Overwrite every field of a todo
    Replace {
        id: TodoId,
        #[command(flatten)]
        draft: DraftArgs,
    },
    /// Update only the given fields of a todo
    Patch {
        id: TodoId,
        #[command(flatten)]
        patch: PatchArgs,
    },
    /// Delete a todo
    Delete { id: TodoId },
    /// Check that the core library is linked
    Ping,
}

#[derive(Debug, Args)]
struct DraftArgs {
    #[arg(long)]
    title: String,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    completed: bool,
    /// Epoch milliseconds or ISO-8601 date/datetime
    #[arg(long, value_parser = parse_due_date)]
    due_date: Option<i64>,
}

impl DraftArgs {
    fn into_draft(self) -> TodoDraft {
        TodoDraft {
            title: self.title,
            description: self.description,
            completed: self.completed,
            due_date: self.due_date,
        }
    }
}

#[derive(Debug, Args)]
struct PatchArgs {
    #[arg(long)]
    title: Option<String>,
    #[arg(long, conflicts_with = "clear_description")]
    description: Option<String>,
    #[arg(long)]
    clear_description: bool,
    #[arg(long)]
    completed: Option<bool>,
    /// Epoch milliseconds or ISO-8601 date/datetime
    #[arg(long, conflicts_with = "clear_due_date", value_parser = parse_due_date)]
    due_date: Option<i64>,
    #[arg(long)]
    clear_due_date: bool,
}

impl PatchArgs {
    fn into_patch(self) -> TodoPatch {
        TodoPatch {
            title: self.title,
            description: tri_state(self.description, self.clear_description),
            completed: self.completed,
            due_date: tri_state(self.due_date, self.clear_due_date),
        }
    }
}

fn tri_state<T>(value: Option<T>, clear: bool) -> Option<Option<T>> {
    if clear {
        Some(None)
    } else {
        value.map(Some)
    }
}

#[derive(Debug, Args)]
struct ListArgs {
    #[arg(long)]
    completed: Option<bool>,
    /// Case-insensitive text matched against title and description
    #[arg(long)]
    q: Option<String>,
    /// `created_at` or `updated_at`, `-` prefix for descending
    #[arg(long, allow_hyphen_values = true)]
    sort: Option<String>,
    #[arg(long)]
    order: Option<String>,
    #[arg(long, allow_hyphen_values = true)]
    limit: Option<i64>,
    #[arg(long, allow_hyphen_values = true)]
    offset: Option<i64>,
}

impl ListArgs {
    fn into_params(self) -> ListParams {
        ListParams {
            completed: self.completed,
            q: self.q,
            sort: self.sort,
            order: self.order,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

#[derive(Debug)]
enum CliError {
    Config(ConfigError),
    Logging(String),
    Repo(RepoError),
    Output(serde_json::Error),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            Self::Repo(RepoError::Validation(_)) => 2,
            Self::Repo(RepoError::NotFound(_)) => 3,
            _ => 1,
        }
    }
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "configuration error: {err}"),
            Self::Logging(err) => write!(f, "logging error: {err}"),
            Self::Repo(err) => write!(f, "{}: {err}", err.code()),
            Self::Output(err) => write!(f, "cannot encode output: {err}"),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<RepoError> for CliError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Output(value)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("event=cli_command module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: Cli) -> Result<Value, CliError> {
    if let Command::Ping = cli.command {
        return Ok(json!({
            "ping": todo_core::ping(),
            "version": todo_core::core_version(),
        }));
    }

    let config = AppConfig::from_env()?;
    if let Some(log_dir) = config.log_dir.as_deref() {
        init_logging(&config.log_level, &absolute(log_dir)).map_err(CliError::Logging)?;
    }

    let store = open_store(&config.storage)?;
    let service = TodoService::with_page_config(store, config.page);
    execute(&service, cli.command)
}

fn execute(service: &TodoService<TodoStore>, command: Command) -> Result<Value, CliError> {
    let output = match command {
        Command::Create(draft) => serde_json::to_value(service.create(&draft.into_draft())?)?,
        Command::Get { id } => serde_json::to_value(service.get(id)?)?,
        Command::List(args) => serde_json::to_value(service.list(&args.into_params())?)?,
        Command::Replace { id, draft } => {
            serde_json::to_value(service.replace(id, &draft.into_draft())?)?
        }
        Command::Patch { id, patch } => {
            serde_json::to_value(service.patch(id, &patch.into_patch())?)?
        }
        Command::Delete { id } => {
            service.delete(id)?;
            json!({ "deleted": id })
        }
        Command::Ping => json!({ "ping": todo_core::ping() }),
    };
    Ok(output)
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
