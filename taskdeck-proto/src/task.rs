//! Task wire types for the taskdeck REST contract.
//!
//! A [`Task`] is identified by a [`TaskId`] that is either a stable server
//! id or a temporary placeholder (`temp-<uuid>`) for a record that has been
//! inserted locally but not yet confirmed. Temporary ids never leave the
//! client.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::de;

/// Maximum allowed task name length in characters.
pub const MAX_TASK_NAME_LENGTH: usize = 255;

/// Prefix marking a locally generated, not-yet-persisted task id.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Identifier of a task, as a string.
///
/// Servers may send integer ids; they are normalized to their decimal
/// string form on decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    /// Wraps a server-assigned id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh temporary id (`temp-` + UUID v7).
    #[must_use]
    pub fn temporary() -> Self {
        Self(format!("{TEMP_ID_PREFIX}{}", Uuid::now_v7()))
    }

    /// Returns `true` if this id was generated locally and is pending
    /// replacement by a server id.
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMP_ID_PREFIX)
    }

    /// Returns the string form of this id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        de::string_or_number(deserializer).map(Self)
    }
}

/// Error returned when a status label is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown task status: {0}")]
pub struct UnknownStatus(pub String);

/// Workflow status of a task; each status is one Kanban column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Not started.
    #[default]
    #[serde(rename = "To Do")]
    Todo,
    /// Being worked on.
    #[serde(rename = "In Progress")]
    InProgress,
    /// Finished.
    #[serde(rename = "Done")]
    Done,
}

impl TaskStatus {
    /// All statuses in board column order.
    pub const ALL: [Self; 3] = [Self::Todo, Self::InProgress, Self::Done];

    /// Human-readable label, identical to the wire form.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Todo => "To Do",
            Self::InProgress => "In Progress",
            Self::Done => "Done",
        }
    }

    /// Position of this status in [`TaskStatus::ALL`].
    #[must_use]
    pub const fn column_index(self) -> usize {
        match self {
            Self::Todo => 0,
            Self::InProgress => 1,
            Self::Done => 2,
        }
    }

    /// The column to the right, saturating at `Done`.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::Todo => Self::InProgress,
            Self::InProgress | Self::Done => Self::Done,
        }
    }

    /// The column to the left, saturating at `Todo`.
    #[must_use]
    pub const fn prev(self) -> Self {
        match self {
            Self::Todo | Self::InProgress => Self::Todo,
            Self::Done => Self::InProgress,
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TaskStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();
        match normalized.as_str() {
            "todo" => Ok(Self::Todo),
            "inprogress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

/// A task as returned by the server (or predicted locally).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Server id, or a temporary id while a create is in flight.
    pub id: TaskId,
    /// Task name (at most [`MAX_TASK_NAME_LENGTH`] characters).
    pub name: String,
    /// Optional free-text description.
    #[serde(default)]
    pub description: Option<String>,
    /// Workflow status.
    #[serde(default)]
    pub status: TaskStatus,
    /// Optional due date.
    #[serde(default, with = "de::optional_date")]
    pub due_date: Option<NaiveDate>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Builds a locally predicted task from a draft, with a fresh
    /// temporary id and client-stamped timestamps.
    #[must_use]
    pub fn temporary(draft: &TaskDraft, now: DateTime<Utc>) -> Self {
        Self {
            id: TaskId::temporary(),
            name: draft.name.clone(),
            description: draft.description.clone(),
            status: draft.status,
            due_date: draft.due_date,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns `true` while this record is a local placeholder.
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.id.is_temporary()
    }

    /// A task is overdue when it has a due date strictly before `today`
    /// and is not done. Tasks due today are not overdue.
    #[must_use]
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status != TaskStatus::Done && self.due_date.is_some_and(|due| due < today)
    }

    /// Returns the current value of `field` as a single-field patch.
    #[must_use]
    pub fn field_value(&self, field: TaskField) -> TaskPatch {
        let mut patch = TaskPatch::default();
        match field {
            TaskField::Name => patch.name = Some(self.name.clone()),
            TaskField::Description => patch.description = Some(self.description.clone()),
            TaskField::Status => patch.status = Some(self.status),
            TaskField::DueDate => patch.due_date = Some(self.due_date),
        }
        patch
    }
}

/// Why a draft or patch was rejected before being sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    /// Name is empty or whitespace only.
    #[error("task name is required")]
    NameEmpty,
    /// Name exceeds [`MAX_TASK_NAME_LENGTH`] characters.
    #[error("task name must be at most {max} characters")]
    NameTooLong {
        /// The limit that was exceeded.
        max: usize,
    },
}

fn validate_name(name: &str) -> Result<(), DraftError> {
    if name.trim().is_empty() {
        return Err(DraftError::NameEmpty);
    }
    if name.chars().count() > MAX_TASK_NAME_LENGTH {
        return Err(DraftError::NameTooLong {
            max: MAX_TASK_NAME_LENGTH,
        });
    }
    Ok(())
}

/// Body of `POST /tasks`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDraft {
    /// Task name.
    pub name: String,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Initial status.
    #[serde(default)]
    pub status: TaskStatus,
    /// Optional due date.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "de::optional_date"
    )]
    pub due_date: Option<NaiveDate>,
}

impl TaskDraft {
    /// Creates a draft with only a name; status defaults to `To Do`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Checks the name constraints.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError`] if the name is blank or too long.
    pub fn validate(&self) -> Result<(), DraftError> {
        validate_name(&self.name)
    }
}

/// A patchable task field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskField {
    /// `name`
    Name,
    /// `description`
    Description,
    /// `status`
    Status,
    /// `due_date`
    DueDate,
}

impl TaskField {
    /// Wire name of the field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Description => "description",
            Self::Status => "status",
            Self::DueDate => "due_date",
        }
    }
}

impl fmt::Display for TaskField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of `PUT /tasks/:id`: only present fields are changed.
///
/// Clearable fields use `Option<Option<_>>`: `None` leaves the field alone,
/// `Some(None)` clears it (sent as `null`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPatch {
    /// New name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New description, or `Some(None)` to clear.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "de::double_option"
    )]
    pub description: Option<Option<String>>,
    /// New status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    /// New due date, or `Some(None)` to clear.
    #[serde(default, skip_serializing_if = "Option::is_none", with = "de::patch_date")]
    pub due_date: Option<Option<NaiveDate>>,
}

impl TaskPatch {
    /// A patch that changes only the status.
    #[must_use]
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// A patch that changes only the name.
    pub fn name(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Sets the description on this patch.
    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = Some(description);
        self
    }

    /// Sets the due date on this patch.
    #[must_use]
    pub const fn with_due_date(mut self, due_date: Option<NaiveDate>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Sets the status on this patch.
    #[must_use]
    pub const fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Returns `true` if no field is present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.due_date.is_none()
    }

    /// The fields present in this patch, in declaration order.
    #[must_use]
    pub fn fields(&self) -> Vec<TaskField> {
        let mut fields = Vec::with_capacity(4);
        if self.name.is_some() {
            fields.push(TaskField::Name);
        }
        if self.description.is_some() {
            fields.push(TaskField::Description);
        }
        if self.status.is_some() {
            fields.push(TaskField::Status);
        }
        if self.due_date.is_some() {
            fields.push(TaskField::DueDate);
        }
        fields
    }

    /// Builds a patch holding `task`'s current values for `fields`.
    #[must_use]
    pub fn capture(task: &Task, fields: &[TaskField]) -> Self {
        fields.iter().fold(Self::default(), |acc, field| {
            acc.merged(task.field_value(*field))
        })
    }

    /// Returns a copy keeping only `fields`.
    #[must_use]
    pub fn restricted_to(&self, fields: &[TaskField]) -> Self {
        let keep = |field| fields.contains(&field);
        Self {
            name: self.name.clone().filter(|_| keep(TaskField::Name)),
            description: self.description.clone().filter(|_| keep(TaskField::Description)),
            status: self.status.filter(|_| keep(TaskField::Status)),
            due_date: self.due_date.filter(|_| keep(TaskField::DueDate)),
        }
    }

    /// Returns `self` with every field present in `other` overwritten.
    #[must_use]
    pub fn merged(mut self, other: Self) -> Self {
        if other.name.is_some() {
            self.name = other.name;
        }
        if other.description.is_some() {
            self.description = other.description;
        }
        if other.status.is_some() {
            self.status = other.status;
        }
        if other.due_date.is_some() {
            self.due_date = other.due_date;
        }
        self
    }

    /// Writes every present field into `task`.
    pub fn apply_to(&self, task: &mut Task) {
        if let Some(name) = &self.name {
            task.name.clone_from(name);
        }
        if let Some(description) = &self.description {
            task.description.clone_from(description);
        }
        if let Some(status) = self.status {
            task.status = status;
        }
        if let Some(due_date) = self.due_date {
            task.due_date = due_date;
        }
    }

    /// Checks the name constraint if the name is being changed.
    ///
    /// # Errors
    ///
    /// Returns [`DraftError`] if a present name is blank or too long.
    pub fn validate(&self) -> Result<(), DraftError> {
        self.name.as_deref().map_or(Ok(()), validate_name)
    }
}

/// Pagination metadata for one page of `GET /tasks`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskListMeta {
    /// Total matching tasks across all pages.
    pub total: u64,
    /// Tasks on the current page.
    pub count: u64,
    /// Page size.
    pub per_page: u64,
    /// 1-based current page.
    pub current_page: u64,
    /// Number of pages (at least 1).
    pub total_pages: u64,
}

impl Default for TaskListMeta {
    fn default() -> Self {
        Self::empty(10)
    }
}

impl TaskListMeta {
    /// Metadata for an empty first page of the given size.
    #[must_use]
    pub const fn empty(per_page: u64) -> Self {
        Self {
            total: 0,
            count: 0,
            per_page: if per_page == 0 { 1 } else { per_page },
            current_page: 1,
            total_pages: 1,
        }
    }

    /// Accounts for one locally inserted task; `count` never exceeds
    /// `per_page`.
    pub fn record_insert(&mut self) {
        self.total += 1;
        self.count = (self.count + 1).min(self.per_page);
    }

    /// Accounts for one locally removed task, flooring at zero.
    pub const fn record_remove(&mut self) {
        self.total = self.total.saturating_sub(1);
        self.count = self.count.saturating_sub(1);
    }
}

/// `data` payload of `GET /tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPage {
    /// Tasks on this page, in server order.
    pub data: Vec<Task>,
    /// Pagination metadata.
    pub meta: TaskListMeta,
}
