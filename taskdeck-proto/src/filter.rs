//! Query parameters for `GET /tasks`.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::task::TaskStatus;

/// Default page size.
pub const DEFAULT_PER_PAGE: u32 = 10;

/// Sortable task columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    /// Creation time.
    #[default]
    CreatedAt,
    /// Due date.
    DueDate,
    /// Name.
    Name,
    /// Status.
    Status,
}

impl SortBy {
    /// All sortable columns, in cycling order.
    pub const ALL: [Self; 4] = [Self::CreatedAt, Self::DueDate, Self::Name, Self::Status];

    /// Query-string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CreatedAt => "created_at",
            Self::DueDate => "due_date",
            Self::Name => "name",
            Self::Status => "status",
        }
    }

    /// The next column in [`SortBy::ALL`], wrapping around.
    #[must_use]
    pub const fn cycle(self) -> Self {
        match self {
            Self::CreatedAt => Self::DueDate,
            Self::DueDate => Self::Name,
            Self::Name => Self::Status,
            Self::Status => Self::CreatedAt,
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    /// Ascending.
    Asc,
    /// Descending.
    #[default]
    Desc,
}

impl SortDirection {
    /// Query-string value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// The opposite direction.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The full set of list parameters applied to the task list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSet {
    /// Only tasks with this status.
    pub status: Option<TaskStatus>,
    /// Substring match on name or description.
    pub search: Option<String>,
    /// Due on or after this date.
    pub due_date_from: Option<NaiveDate>,
    /// Due on or before this date.
    pub due_date_to: Option<NaiveDate>,
    /// Sort column.
    pub sort_by: SortBy,
    /// Sort order.
    pub sort_direction: SortDirection,
    /// 1-based page number.
    pub page: u32,
    /// Page size.
    pub per_page: u32,
}

impl Default for FilterSet {
    fn default() -> Self {
        Self {
            status: None,
            search: None,
            due_date_from: None,
            due_date_to: None,
            sort_by: SortBy::default(),
            sort_direction: SortDirection::default(),
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl FilterSet {
    /// Default filters with a custom page size.
    #[must_use]
    pub fn with_per_page(per_page: u32) -> Self {
        Self {
            per_page: per_page.max(1),
            ..Self::default()
        }
    }

    /// Merges `patch` into this set.
    ///
    /// Any present field other than `page` resets `page` to 1; an explicit
    /// page is only honored when it is the sole change. Blank searches are
    /// normalized to `None`.
    pub fn apply(&mut self, patch: FilterPatch) {
        let resets_page = patch.changes_beyond_page();
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(search) = patch.search {
            self.search = search.filter(|s| !s.trim().is_empty());
        }
        if let Some(from) = patch.due_date_from {
            self.due_date_from = from;
        }
        if let Some(to) = patch.due_date_to {
            self.due_date_to = to;
        }
        if let Some(sort_by) = patch.sort_by {
            self.sort_by = sort_by;
        }
        if let Some(direction) = patch.sort_direction {
            self.sort_direction = direction;
        }
        if let Some(per_page) = patch.per_page {
            self.per_page = per_page.max(1);
        }
        if resets_page {
            self.page = 1;
        } else if let Some(page) = patch.page {
            self.page = page.max(1);
        }
    }

    /// Returns `true` if any narrowing filter (status, search, dates) is set.
    #[must_use]
    pub const fn is_narrowed(&self) -> bool {
        self.status.is_some()
            || self.search.is_some()
            || self.due_date_from.is_some()
            || self.due_date_to.is_some()
    }

    /// Query pairs for `GET /tasks`; unset filters are omitted.
    #[must_use]
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(8);
        if let Some(status) = self.status {
            pairs.push(("status", status.label().to_string()));
        }
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            pairs.push(("search", search.to_string()));
        }
        if let Some(from) = self.due_date_from {
            pairs.push(("due_date_from", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = self.due_date_to {
            pairs.push(("due_date_to", to.format("%Y-%m-%d").to_string()));
        }
        pairs.push(("sort_by", self.sort_by.as_str().to_string()));
        pairs.push(("sort_direction", self.sort_direction.as_str().to_string()));
        pairs.push(("page", self.page.to_string()));
        pairs.push(("per_page", self.per_page.to_string()));
        pairs
    }
}

/// A partial change to a [`FilterSet`].
///
/// Clearable fields use `Option<Option<_>>`: `Some(None)` clears the filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterPatch {
    /// New status filter.
    pub status: Option<Option<TaskStatus>>,
    /// New search text.
    pub search: Option<Option<String>>,
    /// New lower due-date bound.
    pub due_date_from: Option<Option<NaiveDate>>,
    /// New upper due-date bound.
    pub due_date_to: Option<Option<NaiveDate>>,
    /// New sort column.
    pub sort_by: Option<SortBy>,
    /// New sort order.
    pub sort_direction: Option<SortDirection>,
    /// Explicit page.
    pub page: Option<u32>,
    /// New page size.
    pub per_page: Option<u32>,
}

impl FilterPatch {
    /// Changes only the page.
    #[must_use]
    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            ..Self::default()
        }
    }

    /// Changes only the status filter.
    #[must_use]
    pub fn status(status: Option<TaskStatus>) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Changes only the search text.
    #[must_use]
    pub fn search(search: Option<String>) -> Self {
        Self {
            search: Some(search),
            ..Self::default()
        }
    }

    /// Returns `true` if no field is present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Returns `true` if the patch touches anything other than `page`.
    #[must_use]
    pub const fn changes_beyond_page(&self) -> bool {
        self.status.is_some()
            || self.search.is_some()
            || self.due_date_from.is_some()
            || self.due_date_to.is_some()
            || self.sort_by.is_some()
            || self.sort_direction.is_some()
            || self.per_page.is_some()
    }
}
