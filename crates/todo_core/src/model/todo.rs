//! Todo domain model.
//!
//! # Responsibility
//! - Define the canonical todo record and its create/replace/patch inputs.
//! - Own field-level validation shared by every storage backend.
//!
//! # Invariants
//! - `id` is assigned by a repository and never changes afterwards.
//! - `title` is trimmed and holds 1..=`TITLE_MAX_CHARS` characters.
//! - `created_at <= updated_at`, and `updated_at` never moves backwards.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Repository-assigned identifier. Unique per backend instance, never reused.
pub type TodoId = i64;

/// Maximum title length in characters, measured after trimming.
pub const TITLE_MAX_CHARS: usize = 200;

/// Caller-fixable input errors for todo writes and list queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TodoValidationError {
    EmptyTitle,
    TitleTooLong { chars: usize, max: usize },
    InvalidLimit(i64),
    InvalidOffset(i64),
    UnsupportedSortField(String),
    UnsupportedSortOrder(String),
    InvalidDueDate(String),
}

impl Display for TodoValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "title must not be empty"),
            Self::TitleTooLong { chars, max } => {
                write!(f, "title has {chars} characters; at most {max} allowed")
            }
            Self::InvalidLimit(limit) => write!(f, "limit must be positive, got {limit}"),
            Self::InvalidOffset(offset) => {
                write!(f, "offset must be within 0..={}, got {offset}", u32::MAX)
            }
            Self::UnsupportedSortField(field) => write!(
                f,
                "unsupported sort field `{field}`; expected created_at|updated_at"
            ),
            Self::UnsupportedSortOrder(order) => {
                write!(f, "unsupported sort order `{order}`; expected asc|desc")
            }
            Self::InvalidDueDate(raw) => write!(
                f,
                "invalid due_date `{raw}`; expected epoch milliseconds or an ISO-8601 date/datetime"
            ),
        }
    }
}

impl Error for TodoValidationError {}

/// Canonical stored todo record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    /// Unix epoch milliseconds.
    pub due_date: Option<i64>,
    /// Unix epoch milliseconds, set once at creation.
    pub created_at: i64,
    /// Unix epoch milliseconds, refreshed on replace/patch.
    pub updated_at: i64,
}

impl Todo {
    /// Refreshes `updated_at`, never letting it move backwards.
    pub fn touch(&mut self, now_ms: i64) {
        self.updated_at = self.updated_at.max(now_ms);
    }

    /// Overwrites every mutable field with `draft` and refreshes `updated_at`.
    ///
    /// `draft` is expected to be normalized already.
    pub fn replace_with(&mut self, draft: &TodoDraft, now_ms: i64) {
        self.title = draft.title.clone();
        self.description = draft.description.clone();
        self.completed = draft.completed;
        self.due_date = draft.due_date;
        self.touch(now_ms);
    }
}

/// Full input for create and replace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, deserialize_with = "deserialize_due_date")]
    pub due_date: Option<i64>,
}

impl TodoDraft {
    /// Creates a draft with only a title; other fields take their defaults.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Returns a copy with the title trimmed, or the first violated rule.
    pub fn normalized(&self) -> Result<Self, TodoValidationError> {
        Ok(Self {
            title: normalize_title(&self.title)?,
            ..self.clone()
        })
    }

    /// Builds the stored record for a freshly assigned id.
    pub(crate) fn into_todo(self, id: TodoId, now_ms: i64) -> Todo {
        Todo {
            id,
            title: self.title,
            description: self.description,
            completed: self.completed,
            due_date: self.due_date,
            created_at: now_ms,
            updated_at: now_ms,
        }
    }
}

/// Partial input for patch.
///
/// `description` and `due_date` are tri-state: `None` leaves the field alone,
/// `Some(None)` clears it and `Some(Some(v))` sets it. When decoded from JSON,
/// an absent key maps to `None` and an explicit `null` to `Some(None)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_present",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(
        default,
        deserialize_with = "deserialize_present_due_date",
        skip_serializing_if = "Option::is_none"
    )]
    pub due_date: Option<Option<i64>>,
}

impl TodoPatch {
    /// Returns a copy with a supplied title trimmed and checked.
    pub fn normalized(&self) -> Result<Self, TodoValidationError> {
        let title = match self.title.as_deref() {
            Some(raw) => Some(normalize_title(raw)?),
            None => None,
        };
        Ok(Self {
            title,
            ..self.clone()
        })
    }

    /// Returns whether the patch carries no field at all.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.completed.is_none()
            && self.due_date.is_none()
    }

    /// Applies supplied fields to `todo` and refreshes `updated_at`.
    ///
    /// The patch is expected to be normalized already. An empty patch still
    /// counts as a successful mutation and refreshes `updated_at`.
    pub fn apply_to(&self, todo: &mut Todo, now_ms: i64) {
        if let Some(title) = self.title.as_ref() {
            todo.title = title.clone();
        }
        if let Some(description) = self.description.as_ref() {
            todo.description = description.clone();
        }
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
        if let Some(due_date) = self.due_date {
            todo.due_date = due_date;
        }
        todo.touch(now_ms);
    }
}

/// Trims a title and enforces the 1..=`TITLE_MAX_CHARS` rule.
pub fn normalize_title(raw: &str) -> Result<String, TodoValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(TodoValidationError::EmptyTitle);
    }
    let chars = trimmed.chars().count();
    if chars > TITLE_MAX_CHARS {
        return Err(TodoValidationError::TitleTooLong {
            chars,
            max: TITLE_MAX_CHARS,
        });
    }
    Ok(trimmed.to_string())
}

// Present keys (including explicit `null`) decode to `Some(..)`; absent keys
// fall back to `#[serde(default)]`.
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Converts a due date to epoch milliseconds.
///
/// Accepts integer milliseconds, RFC 3339 datetimes with an offset, naive
/// datetimes (read as UTC) and plain dates (midnight UTC).
pub fn parse_due_date(raw: &str) -> Result<i64, TodoValidationError> {
    const NAIVE_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];

    let text = raw.trim();
    if let Ok(millis) = text.parse::<i64>() {
        return Ok(millis);
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(text) {
        return Ok(at.timestamp_millis());
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(Utc.from_utc_datetime(&naive).timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| Utc.from_utc_datetime(&midnight).timestamp_millis())
        .ok_or_else(|| TodoValidationError::InvalidDueDate(text.to_string()))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DueDateInput {
    Millis(i64),
    Text(String),
}

impl DueDateInput {
    fn into_millis(self) -> Result<i64, TodoValidationError> {
        match self {
            Self::Millis(millis) => Ok(millis),
            Self::Text(text) => parse_due_date(&text),
        }
    }
}

fn deserialize_due_date<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<DueDateInput>::deserialize(deserializer)?
        .map(DueDateInput::into_millis)
        .transpose()
        .map_err(serde::de::Error::custom)
}

fn deserialize_present_due_date<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_due_date(deserializer).map(Some)
}
