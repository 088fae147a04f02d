//! Filter editing: a draft kept apart from the applied filters.
//!
//! Search edits are debounced and applied on their own; every other field
//! waits for an explicit submit. The controller only produces
//! [`FilterPatch`]es; applying them (and reloading) is the engine's job.

mod debounce;

pub use debounce::Debouncer;

use std::time::{Duration, Instant};

use chrono::NaiveDate;
use taskdeck_proto::filter::{FilterPatch, FilterSet, SortBy, SortDirection};
use taskdeck_proto::task::TaskStatus;

/// Filter values as currently edited, not yet applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterDraft {
    pub search: String,
    pub status: Option<TaskStatus>,
    pub due_date_from: Option<NaiveDate>,
    pub due_date_to: Option<NaiveDate>,
    pub sort_by: SortBy,
    pub sort_direction: SortDirection,
}

impl FilterDraft {
    fn from_applied(applied: &FilterSet) -> Self {
        Self {
            search: applied.search.clone().unwrap_or_default(),
            status: applied.status,
            due_date_from: applied.due_date_from,
            due_date_to: applied.due_date_to,
            sort_by: applied.sort_by,
            sort_direction: applied.sort_direction,
        }
    }
}

fn normalize_search(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Owns the draft filters and the search debounce timer.
#[derive(Debug, Clone)]
pub struct FilterController {
    draft: FilterDraft,
    applied_search: Option<String>,
    search: Debouncer<String>,
}

impl FilterController {
    /// A controller whose search edits settle after `debounce`.
    #[must_use]
    pub fn new(debounce: Duration) -> Self {
        Self {
            draft: FilterDraft::default(),
            applied_search: None,
            search: Debouncer::new(debounce),
        }
    }

    #[must_use]
    pub const fn draft(&self) -> &FilterDraft {
        &self.draft
    }

    /// Re-seeds the draft from the applied filters.
    pub fn sync_from(&mut self, applied: &FilterSet) {
        self.draft = FilterDraft::from_applied(applied);
        self.applied_search.clone_from(&applied.search);
        self.search.cancel();
    }

    /// Records a search keystroke at `now`, restarting the debounce window.
    pub fn edit_search(&mut self, text: impl Into<String>, now: Instant) {
        let text = text.into();
        self.draft.search.clone_from(&text);
        self.search.push(text, now);
    }

    pub const fn set_status(&mut self, status: Option<TaskStatus>) {
        self.draft.status = status;
    }

    pub const fn set_due_date_from(&mut self, date: Option<NaiveDate>) {
        self.draft.due_date_from = date;
    }

    pub const fn set_due_date_to(&mut self, date: Option<NaiveDate>) {
        self.draft.due_date_to = date;
    }

    pub const fn set_sort_by(&mut self, sort_by: SortBy) {
        self.draft.sort_by = sort_by;
    }

    pub const fn set_sort_direction(&mut self, direction: SortDirection) {
        self.draft.sort_direction = direction;
    }

    /// When the pending search edit will fire.
    #[must_use]
    pub fn search_deadline(&self) -> Option<Instant> {
        self.search.deadline()
    }

    /// Fires the debounced search if its window has passed and it differs
    /// from the applied search.
    pub fn poll(&mut self, now: Instant) -> Option<FilterPatch> {
        let text = self.search.poll(now)?;
        let search = normalize_search(&text);
        if search == self.applied_search {
            tracing::trace!("debounced search unchanged");
            return None;
        }
        tracing::debug!(search = ?search, "applying debounced search");
        self.applied_search.clone_from(&search);
        Some(FilterPatch::search(search))
    }

    /// Applies the whole draft, flushing any pending search edit.
    pub fn submit(&mut self) -> FilterPatch {
        self.search.cancel();
        let search = normalize_search(&self.draft.search);
        self.applied_search.clone_from(&search);
        FilterPatch {
            status: Some(self.draft.status),
            search: Some(search),
            due_date_from: Some(self.draft.due_date_from),
            due_date_to: Some(self.draft.due_date_to),
            sort_by: Some(self.draft.sort_by),
            sort_direction: Some(self.draft.sort_direction),
            page: None,
            per_page: None,
        }
    }

    /// Clears the draft and cancels any pending search.
    pub fn reset(&mut self) {
        self.draft = FilterDraft::default();
        self.applied_search = None;
        self.search.cancel();
    }
}
