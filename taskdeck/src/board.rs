//! Presentation helpers for the Kanban board: column grouping, the
//! pagination window and due-date display.

use chrono::{Local, NaiveDate};
use taskdeck_proto::task::{Task, TaskListMeta, TaskStatus};

/// Number of page buttons shown at once.
pub const PAGE_WINDOW: u64 = 5;

/// Splits `tasks` into the three status columns, preserving list order
/// within each column.
#[must_use]
pub fn columns(tasks: &[Task]) -> [Vec<Task>; 3] {
    let mut columns: [Vec<Task>; 3] = Default::default();
    for task in tasks {
        columns[task.status.column_index()].push(task.clone());
    }
    columns
}

/// Which page buttons to render around the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageWindow {
    /// Consecutive pages, at most [`PAGE_WINDOW`] of them.
    pub pages: Vec<u64>,
    pub current: u64,
    pub total: u64,
}

impl PageWindow {
    /// Centres the window on `current` where possible, sliding it back
    /// when it would run past the last page.
    #[must_use]
    pub fn around(current: u64, total: u64) -> Self {
        let total = total.max(1);
        let current = current.clamp(1, total);
        let mut start = current.saturating_sub(2).max(1);
        let end = total.min(start + PAGE_WINDOW - 1);
        if end - start < PAGE_WINDOW - 1 && start > 1 {
            start = end.saturating_sub(PAGE_WINDOW - 1).max(1);
        }
        Self {
            pages: (start..=end).collect(),
            current,
            total,
        }
    }

    /// The window for a list page, or `None` when there is nothing to page.
    #[must_use]
    pub fn for_meta(meta: &TaskListMeta) -> Option<Self> {
        (meta.total_pages > 1).then(|| Self::around(meta.current_page, meta.total_pages))
    }

    fn first(&self) -> u64 {
        self.pages.first().copied().unwrap_or(1)
    }

    fn last(&self) -> u64 {
        self.pages.last().copied().unwrap_or(self.total)
    }

    /// Whether a separate "1" button precedes the window.
    #[must_use]
    pub fn shows_first(&self) -> bool {
        self.first() > 1
    }

    /// Whether an ellipsis separates the "1" button from the window.
    #[must_use]
    pub fn leading_gap(&self) -> bool {
        self.first() > 2
    }

    /// Whether a separate last-page button follows the window.
    #[must_use]
    pub fn shows_last(&self) -> bool {
        self.last() < self.total
    }

    /// Whether an ellipsis separates the window from the last-page button.
    #[must_use]
    pub fn trailing_gap(&self) -> bool {
        self.last() + 1 < self.total
    }

    #[must_use]
    pub const fn has_prev(&self) -> bool {
        self.current > 1
    }

    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.current < self.total
    }
}

/// "Showing 10 of 42 results".
#[must_use]
pub fn results_summary(meta: &TaskListMeta) -> String {
    format!("Showing {} of {} results", meta.count, meta.total)
}

/// Today's date in the local time zone.
#[must_use]
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Due date as shown on a card, e.g. "Mar 04, 2025 (Overdue)".
#[must_use]
pub fn due_label(task: &Task, today: NaiveDate) -> Option<String> {
    let due = task.due_date?;
    let mut label = due.format("%b %d, %Y").to_string();
    if task.is_overdue(today) {
        label.push_str(" (Overdue)");
    }
    Some(label)
}

/// Column heading with its card count.
#[must_use]
pub fn column_title(status: TaskStatus, count: usize) -> String {
    format!("{status} ({count})")
}
