//! List query model: filtering, ordering and pagination.
//!
//! # Responsibility
//! - Turn raw list parameters into a validated `TodoListQuery`.
//! - Define the single filter/sort/slice algorithm every backend reproduces.
//!
//! # Invariants
//! - Ordering ties break by ascending id (creation order) in both directions.
//! - `TodoPage::total` counts filter matches before slicing.
//! - Search folds ASCII case only, matching SQLite's built-in `lower()`.

use crate::model::todo::{Todo, TodoValidationError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Page-size policy supplied by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageConfig {
    /// Applied when the caller gives no `limit`.
    pub default_limit: u32,
    /// Larger requested limits are capped to this value.
    pub max_limit: u32,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_PAGE_LIMIT,
            max_limit: MAX_PAGE_LIMIT,
        }
    }
}

/// Sortable timestamp column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
}

impl SortField {
    pub fn parse(value: &str) -> Result<Self, TodoValidationError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "created_at" => Ok(Self::CreatedAt),
            "updated_at" => Ok(Self::UpdatedAt),
            _ => Err(TodoValidationError::UnsupportedSortField(
                value.trim().to_string(),
            )),
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }

    fn key(self, todo: &Todo) -> i64 {
        match self {
            Self::CreatedAt => todo.created_at,
            Self::UpdatedAt => todo.updated_at,
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn parse(value: &str) -> Result<Self, TodoValidationError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(TodoValidationError::UnsupportedSortOrder(
                value.trim().to_string(),
            )),
        }
    }

    pub fn sql_keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Unvalidated list parameters as received from a caller.
///
/// `sort` accepts `created_at`/`updated_at` with an optional leading `-` for
/// descending order; `order` (`asc`/`desc`) overrides that direction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub order: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub offset: Option<i64>,
}

/// Validated list query executed by repositories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TodoListQuery {
    /// Exact match on `completed` when set.
    pub completed: Option<bool>,
    /// Case-insensitive substring over title and description when non-blank.
    pub search: Option<String>,
    pub sort: SortField,
    pub order: SortOrder,
    /// Page size; must be positive.
    pub limit: u32,
    /// Rows skipped after sorting.
    pub offset: u32,
}

impl Default for TodoListQuery {
    fn default() -> Self {
        Self {
            completed: None,
            search: None,
            sort: SortField::default(),
            order: SortOrder::default(),
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

impl TodoListQuery {
    /// Validates raw parameters against the page-size policy.
    ///
    /// # Errors
    /// - `InvalidLimit` when `limit <= 0`.
    /// - `InvalidOffset` when `offset` is negative or exceeds `u32::MAX`.
    /// - `UnsupportedSortField` / `UnsupportedSortOrder` for unknown tokens.
    pub fn from_params(
        params: &ListParams,
        config: &PageConfig,
    ) -> Result<Self, TodoValidationError> {
        let (sort, mut order) = parse_sort_token(params.sort.as_deref())?;
        if let Some(raw_order) = params.order.as_deref() {
            order = SortOrder::parse(raw_order)?;
        }

        let max_limit = config.max_limit.max(1);
        let limit = match params.limit {
            None => config.default_limit.clamp(1, max_limit),
            Some(limit) if limit <= 0 => return Err(TodoValidationError::InvalidLimit(limit)),
            Some(limit) => u32::try_from(limit).unwrap_or(u32::MAX).min(max_limit),
        };
        let offset = match params.offset {
            None => 0,
            Some(offset) => u32::try_from(offset)
                .map_err(|_| TodoValidationError::InvalidOffset(offset))?,
        };

        Ok(Self {
            completed: params.completed,
            search: params
                .q
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string),
            sort,
            order,
            limit,
            offset,
        })
    }

    /// Rejects queries that could not come out of `from_params`.
    pub fn validate(&self) -> Result<(), TodoValidationError> {
        if self.limit == 0 {
            return Err(TodoValidationError::InvalidLimit(0));
        }
        Ok(())
    }

    /// Lowercased (ASCII) trimmed search text, or `None` for no search.
    pub fn search_needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_ascii_lowercase)
    }

    /// Returns whether `todo` passes the completed and search filters.
    pub fn matches(&self, todo: &Todo) -> bool {
        if let Some(completed) = self.completed {
            if todo.completed != completed {
                return false;
            }
        }
        match self.search_needle() {
            Some(needle) => text_contains(&todo.title, &needle)
                || todo
                    .description
                    .as_deref()
                    .is_some_and(|description| text_contains(description, &needle)),
            None => true,
        }
    }

    /// Orders two todos by the sort key, breaking ties by ascending id.
    pub fn compare(&self, left: &Todo, right: &Todo) -> Ordering {
        let by_key = self.sort.key(left).cmp(&self.sort.key(right));
        let by_key = match self.order {
            SortOrder::Asc => by_key,
            SortOrder::Desc => by_key.reverse(),
        };
        by_key.then_with(|| left.id.cmp(&right.id))
    }

    /// Runs filter, sort and slice over an unordered set of todos.
    pub fn apply<I>(&self, todos: I) -> TodoPage
    where
        I: IntoIterator<Item = Todo>,
    {
        let mut matching: Vec<Todo> = todos.into_iter().filter(|todo| self.matches(todo)).collect();
        let total = matching.len() as u64;
        matching.sort_by(|left, right| self.compare(left, right));

        let items = matching
            .into_iter()
            .skip(self.offset as usize)
            .take(self.limit as usize)
            .collect();

        TodoPage {
            items,
            total,
            limit: self.limit,
            offset: self.offset,
        }
    }
}

/// One page of list results plus the pre-pagination match count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TodoPage {
    pub items: Vec<Todo>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
}

fn parse_sort_token(token: Option<&str>) -> Result<(SortField, SortOrder), TodoValidationError> {
    let token = token.map(str::trim).unwrap_or_default();
    if token.is_empty() {
        return Ok((SortField::default(), SortOrder::default()));
    }
    match token.strip_prefix('-') {
        Some(field) => Ok((SortField::parse(field)?, SortOrder::Desc)),
        None => Ok((SortField::parse(token)?, SortOrder::Asc)),
    }
}

fn text_contains(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_ascii_lowercase().contains(needle_lower)
}

#[cfg(test)]
mod tests {
    use super::{ListParams, PageConfig, SortField, SortOrder, TodoListQuery};
    use crate::model::todo::{Todo, TodoValidationError};

    fn todo(id: i64, title: &str, completed: bool, created_at: i64) -> Todo {
        Todo {
            id,
            title: title.to_string(),
            description: None,
            completed,
            due_date: None,
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn defaults_to_created_at_ascending_with_configured_limit() {
        let config = PageConfig {
            default_limit: 5,
            max_limit: 10,
        };
        let query = TodoListQuery::from_params(&ListParams::default(), &config).unwrap();

        assert_eq!(query.sort, SortField::CreatedAt);
        assert_eq!(query.order, SortOrder::Asc);
        assert_eq!(query.limit, 5);
        assert_eq!(query.offset, 0);
    }

    #[test]
    fn sign_token_and_order_override() {
        let config = PageConfig::default();
        let params = ListParams {
            sort: Some("-updated_at".to_string()),
            ..ListParams::default()
        };
        let query = TodoListQuery::from_params(&params, &config).unwrap();
        assert_eq!(query.sort, SortField::UpdatedAt);
        assert_eq!(query.order, SortOrder::Desc);

        let params = ListParams {
            sort: Some("-updated_at".to_string()),
            order: Some("ASC".to_string()),
            ..ListParams::default()
        };
        let query = TodoListQuery::from_params(&params, &config).unwrap();
        assert_eq!(query.order, SortOrder::Asc);
    }

    #[test]
    fn rejects_bad_pagination_and_sort_tokens() {
        let config = PageConfig::default();
        let cases = [
            (
                ListParams {
                    limit: Some(0),
                    ..ListParams::default()
                },
                TodoValidationError::InvalidLimit(0),
            ),
            (
                ListParams {
                    offset: Some(-1),
                    ..ListParams::default()
                },
                TodoValidationError::InvalidOffset(-1),
            ),
            (
                ListParams {
                    offset: Some(i64::from(u32::MAX) + 1),
                    ..ListParams::default()
                },
                TodoValidationError::InvalidOffset(i64::from(u32::MAX) + 1),
            ),
            (
                ListParams {
                    sort: Some("title".to_string()),
                    ..ListParams::default()
                },
                TodoValidationError::UnsupportedSortField("title".to_string()),
            ),
            (
                ListParams {
                    order: Some("sideways".to_string()),
                    ..ListParams::default()
                },
                TodoValidationError::UnsupportedSortOrder("sideways".to_string()),
            ),
        ];

        for (params, expected) in cases {
            assert_eq!(
                TodoListQuery::from_params(&params, &config).unwrap_err(),
                expected
            );
        }
    }

    #[test]
    fn largest_offset_is_echoed_unchanged() {
        let params = ListParams {
            offset: Some(i64::from(u32::MAX)),
            ..ListParams::default()
        };
        let page = TodoListQuery::from_params(&params, &PageConfig::default())
            .unwrap()
            .apply(vec![todo(1, "only", false, 10)]);

        assert_eq!(page.offset, u32::MAX);
        assert_eq!(page.total, 1);
        assert!(page.items.is_empty());
    }

    #[test]
    fn caps_limit_at_configured_maximum() {
        let params = ListParams {
            limit: Some(5_000),
            ..ListParams::default()
        };
        let query = TodoListQuery::from_params(&params, &PageConfig::default()).unwrap();
        assert_eq!(query.limit, 100);
    }

    #[test]
    fn blank_search_is_no_filter() {
        let params = ListParams {
            q: Some("   ".to_string()),
            ..ListParams::default()
        };
        let query = TodoListQuery::from_params(&params, &PageConfig::default()).unwrap();
        assert_eq!(query.search, None);
    }

    #[test]
    fn descending_order_keeps_creation_order_for_ties() {
        let query = TodoListQuery {
            order: SortOrder::Desc,
            ..TodoListQuery::default()
        };
        let page = query.apply(vec![
            todo(3, "c", false, 10),
            todo(1, "a", false, 10),
            todo(2, "b", false, 20),
        ]);

        let ids: Vec<i64> = page.items.iter().map(|item| item.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn apply_counts_matches_before_slicing() {
        let query = TodoListQuery {
            completed: Some(true),
            limit: 1,
            offset: 1,
            ..TodoListQuery::default()
        };
        let page = query.apply(vec![
            todo(1, "a", true, 1),
            todo(2, "b", false, 2),
            todo(3, "c", true, 3),
            todo(4, "d", true, 4),
        ]);

        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id, 3);
    }

    #[test]
    fn search_is_ascii_case_insensitive_over_title_and_description() {
        let mut with_description = todo(2, "Groceries", false, 2);
        with_description.description = Some("BUY bread".to_string());
        let query = TodoListQuery {
            search: Some("buy".to_string()),
            ..TodoListQuery::default()
        };

        assert!(query.matches(&todo(1, "Buy milk", false, 1)));
        assert!(query.matches(&with_description));
        assert!(!query.matches(&todo(3, "Sell car", false, 3)));
    }

    #[test]
    fn validate_rejects_zero_limit() {
        let query = TodoListQuery {
            limit: 0,
            ..TodoListQuery::default()
        };
        assert_eq!(
            query.validate().unwrap_err(),
            TodoValidationError::InvalidLimit(0)
        );
    }
}
