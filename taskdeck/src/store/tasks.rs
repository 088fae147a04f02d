//! Task slice: the task list, its pagination metadata, and applied filters.
//!
//! Every transition is synchronous and total. Operations addressed by id
//! do nothing when the id is not in the list.

use std::collections::{BTreeMap, HashSet};

use taskdeck_proto::filter::{FilterPatch, FilterSet};
use taskdeck_proto::task::{Task, TaskField, TaskId, TaskListMeta, TaskPatch};

/// State of the task list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskState {
    tasks: Vec<Task>,
    current: Option<Task>,
    meta: TaskListMeta,
    filters: FilterSet,
    loading: bool,
    error: Option<String>,
    field_errors: BTreeMap<String, String>,
    discarded: HashSet<TaskId>,
    default_per_page: u32,
}

impl Default for TaskState {
    fn default() -> Self {
        Self::new(taskdeck_proto::filter::DEFAULT_PER_PAGE)
    }
}

impl TaskState {
    /// Empty state whose filters default to `per_page` tasks per page.
    #[must_use]
    pub fn new(per_page: u32) -> Self {
        let filters = FilterSet::with_per_page(per_page);
        Self {
            tasks: Vec::new(),
            current: None,
            meta: TaskListMeta::empty(u64::from(filters.per_page)),
            default_per_page: filters.per_page,
            filters,
            loading: false,
            error: None,
            field_errors: BTreeMap::new(),
            discarded: HashSet::new(),
        }
    }

    // -- selectors --

    /// Tasks in display order.
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// The task open in the detail view.
    #[must_use]
    pub const fn current(&self) -> Option<&Task> {
        self.current.as_ref()
    }

    #[must_use]
    pub const fn meta(&self) -> &TaskListMeta {
        &self.meta
    }

    #[must_use]
    pub const fn filters(&self) -> &FilterSet {
        &self.filters
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Inline validation messages from the last rejected create or update.
    #[must_use]
    pub const fn field_errors(&self) -> &BTreeMap<String, String> {
        &self.field_errors
    }

    /// Looks up a task in the list.
    #[must_use]
    pub fn get(&self, id: &TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    #[must_use]
    pub fn contains(&self, id: &TaskId) -> bool {
        self.get(id).is_some()
    }

    /// Tasks grouped into board columns, in status order.
    #[must_use]
    pub fn columns(&self) -> [Vec<Task>; 3] {
        crate::board::columns(&self.tasks)
    }

    // -- loading --

    pub fn load_start(&mut self) {
        self.loading = true;
        self.error = None;
    }

    /// Replaces the list with a server page.
    pub fn load_succeeded(&mut self, tasks: Vec<Task>, meta: TaskListMeta) {
        let fresh_current = self
            .current
            .as_ref()
            .and_then(|current| tasks.iter().find(|t| t.id == current.id).cloned());
        if fresh_current.is_some() {
            self.current = fresh_current;
        }
        self.tasks = tasks;
        self.meta = meta;
        self.loading = false;
        self.error = None;
    }

    pub fn load_failed(&mut self, error: impl Into<String>) {
        self.loading = false;
        self.error = Some(error.into());
    }

    pub fn set_current(&mut self, task: Option<Task>) {
        self.current = task;
    }

    pub fn set_error(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
    }

    pub fn clear_error(&mut self) {
        self.error = None;
        self.field_errors.clear();
    }

    pub fn set_field_errors(&mut self, errors: BTreeMap<String, String>) {
        self.field_errors = errors;
    }

    // -- local edits --

    /// Inserts a task at the head of the list.
    pub fn insert_local(&mut self, task: Task) {
        self.tasks.insert(0, task);
        self.meta.record_insert();
    }

    /// Swaps the record `old` for `new` in place. Returns `false` if `old`
    /// is not in the list.
    pub fn replace_by_id(&mut self, old: &TaskId, new: Task) -> bool {
        let Some(slot) = self.tasks.iter_mut().find(|t| &t.id == old) else {
            return false;
        };
        if self.current.as_ref().is_some_and(|c| &c.id == old) {
            self.current = Some(new.clone());
        }
        *slot = new;
        true
    }

    /// Writes `patch` into the list record and the current task. Returns
    /// `false` if `id` is not in the list.
    pub fn patch_by_id(&mut self, id: &TaskId, patch: &TaskPatch) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|t| &t.id == id) else {
            return false;
        };
        patch.apply_to(task);
        if let Some(current) = self.current.as_mut().filter(|c| &c.id == id) {
            patch.apply_to(current);
        }
        true
    }

    /// Copies the server's values of `fields`, plus `updated_at`, onto the
    /// local record. Other fields keep their local values.
    pub fn merge_confirmed(&mut self, id: &TaskId, fields: &[TaskField], server: &Task) -> bool {
        let confirmed = TaskPatch::capture(server, fields);
        let apply = |task: &mut Task| {
            confirmed.apply_to(task);
            task.updated_at = server.updated_at;
        };
        let Some(task) = self.tasks.iter_mut().find(|t| &t.id == id) else {
            return false;
        };
        apply(task);
        if let Some(current) = self.current.as_mut().filter(|c| &c.id == id) {
            apply(current);
        }
        true
    }

    /// Removes a task, decrementing `total` and `count` (floored at 0) and
    /// clearing the current task if it matches.
    pub fn remove_by_id(&mut self, id: &TaskId) -> Option<Task> {
        let index = self.tasks.iter().position(|t| &t.id == id)?;
        let removed = self.tasks.remove(index);
        self.meta.record_remove();
        if self.current.as_ref().is_some_and(|c| &c.id == id) {
            self.current = None;
        }
        Some(removed)
    }

    /// Marks a temporary id whose record was removed while its create was
    /// still in flight.
    pub fn mark_discarded(&mut self, id: TaskId) {
        self.discarded.insert(id);
    }

    /// Returns `true` (once) if `id` was marked discarded.
    pub fn take_discarded(&mut self, id: &TaskId) -> bool {
        self.discarded.remove(id)
    }

    // -- filters --

    pub fn set_filters(&mut self, patch: FilterPatch) {
        self.filters.apply(patch);
    }

    /// Restores the default filters, keeping the configured page size.
    pub fn reset_filters(&mut self) {
        self.filters = FilterSet::with_per_page(self.default_per_page);
    }

    /// Empties the slice, as on logout.
    pub fn clear(&mut self) {
        *self = Self::new(self.default_per_page);
    }
}
