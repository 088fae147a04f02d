//! Optimistic mutations and their reconciliation with the server.
//!
//! Every mutation applies its predicted change to the [`Store`]
//! synchronously, then issues the server call on a spawned task and
//! returns a [`Mutation`] handle. Each mutation moves through
//! `Idle -> Applying -> {Confirmed | RolledBack | Unreconciled}`, or
//! straight to `Noop` when there is nothing to do.
//!
//! Reconciliation policy per operation:
//! - update: rolled back field by field on failure; on success only the
//!   patched fields (plus `updated_at`) are taken from the server.
//! - create: matched back by its temporary id. A failed create is *not*
//!   rolled back; the placeholder stays until the next refresh.
//! - delete: a failure triggers a full list refetch.
//!
//! Concurrent mutations on different fields of the same task both survive.
//! On the same field the mutation whose response settles last wins.
//! Mutations cannot be cancelled; dropping the handle detaches it.

mod snapshot;

pub use snapshot::RollbackSnapshot;

use std::sync::Arc;

use chrono::Utc;
use taskdeck_proto::filter::FilterPatch;
use taskdeck_proto::task::{DraftError, Task, TaskDraft, TaskId, TaskPatch, TaskStatus};
use tokio::task::JoinHandle;

use crate::api::{ApiClient, ApiError, Backend};
use crate::store::{Store, TaskState};

const CREATED: &str = "Task created successfully";
const UPDATED: &str = "Task updated successfully";
const DELETED: &str = "Task deleted successfully";

/// Which operation a [`Mutation`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Create,
    Update,
    Delete,
    ChangeStatus,
}

/// How a mutation settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// Nothing to do: empty patch, unchanged status, or unknown id.
    Noop,
    /// Rejected locally before any change was applied.
    Rejected(DraftError),
    /// The server accepted the change. Carries the server record for
    /// creates and updates.
    Confirmed(Option<Task>),
    /// The server refused; the local change was reverted.
    RolledBack(ApiError),
    /// The server refused and local state may differ from the server's
    /// until the next refresh.
    Unreconciled(ApiError),
}

impl MutationOutcome {
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }

    /// The server error, for failed mutations.
    #[must_use]
    pub const fn error(&self) -> Option<&ApiError> {
        match self {
            Self::RolledBack(error) | Self::Unreconciled(error) => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug)]
enum Progress {
    Settled(MutationOutcome),
    Applying(JoinHandle<MutationOutcome>),
}

/// Handle to an issued mutation.
#[derive(Debug)]
pub struct Mutation {
    kind: MutationKind,
    target: TaskId,
    progress: Progress,
}

impl Mutation {
    const fn settled_now(kind: MutationKind, target: TaskId, outcome: MutationOutcome) -> Self {
        Self {
            kind,
            target,
            progress: Progress::Settled(outcome),
        }
    }

    const fn applying(kind: MutationKind, target: TaskId, handle: JoinHandle<MutationOutcome>) -> Self {
        Self {
            kind,
            target,
            progress: Progress::Applying(handle),
        }
    }

    #[must_use]
    pub const fn kind(&self) -> MutationKind {
        self.kind
    }

    /// The task this mutation addresses; for creates, the temporary id.
    #[must_use]
    pub const fn target(&self) -> &TaskId {
        &self.target
    }

    /// Waits until the mutation settles.
    pub async fn settled(self) -> MutationOutcome {
        match self.progress {
            Progress::Settled(outcome) => outcome,
            Progress::Applying(handle) => handle.await.unwrap_or_else(|e| {
                tracing::error!(task_id = %self.target, error = %e, "mutation task failed");
                MutationOutcome::Unreconciled(ApiError::Network(format!("mutation aborted: {e}")))
            }),
        }
    }
}

/// Issues optimistic mutations against the shared store.
pub struct OptimisticEngine<B> {
    api: Arc<ApiClient<B>>,
}

impl<B> Clone for OptimisticEngine<B> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
        }
    }
}

impl<B> std::fmt::Debug for OptimisticEngine<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimisticEngine").finish_non_exhaustive()
    }
}

impl<B: Backend> OptimisticEngine<B> {
    pub const fn new(api: Arc<ApiClient<B>>) -> Self {
        Self { api }
    }

    /// The API client mutations are sent through.
    #[must_use]
    pub const fn api(&self) -> &Arc<ApiClient<B>> {
        &self.api
    }

    fn store(&self) -> &Store {
        self.api.store()
    }

    /// Inserts a placeholder for `draft` at the head of the list and
    /// creates it on the server.
    ///
    /// Must be called from within a tokio runtime.
    pub fn create(&self, draft: TaskDraft) -> Mutation {
        let placeholder = Task::temporary(&draft, Utc::now());
        let temp_id = placeholder.id.clone();
        if let Err(e) = draft.validate() {
            return Mutation::settled_now(MutationKind::Create, temp_id, MutationOutcome::Rejected(e));
        }
        self.store().with_tasks(|tasks| {
            tasks.clear_error();
            tasks.insert_local(placeholder);
        });
        tracing::debug!(task_id = %temp_id, "create applied locally");

        let engine = self.clone();
        let correlation = temp_id.clone();
        let handle = tokio::spawn(async move { engine.settle_create(correlation, draft).await });
        Mutation::applying(MutationKind::Create, temp_id, handle)
    }

    /// Writes `patch` locally and sends it to the server.
    ///
    /// An empty patch, an unknown id or a temporary id is a no-op.
    pub fn update(&self, id: TaskId, patch: TaskPatch) -> Mutation {
        self.apply_update(MutationKind::Update, id, patch, UPDATED.to_string())
    }

    /// Moves a task to another column. No-op when the task is unknown or
    /// already has `status`.
    pub fn change_status(&self, id: TaskId, status: TaskStatus) -> Mutation {
        let current = self.store().with_tasks(|tasks| tasks.get(&id).map(|t| t.status));
        if current.is_none_or(|current| current == status) {
            tracing::debug!(task_id = %id, %status, "status change skipped");
            return Mutation::settled_now(MutationKind::ChangeStatus, id, MutationOutcome::Noop);
        }
        self.apply_update(
            MutationKind::ChangeStatus,
            id,
            TaskPatch::status(status),
            format!("Task moved to {status}"),
        )
    }

    fn apply_update(&self, kind: MutationKind, id: TaskId, patch: TaskPatch, success: String) -> Mutation {
        if patch.is_empty() || id.is_temporary() {
            return Mutation::settled_now(kind, id, MutationOutcome::Noop);
        }
        if let Err(e) = patch.validate() {
            return Mutation::settled_now(kind, id, MutationOutcome::Rejected(e));
        }
        let snapshot = self.store().with_tasks(|tasks| {
            let snapshot = RollbackSnapshot::capture(tasks.get(&id)?, &patch);
            tasks.patch_by_id(&id, &patch);
            tasks.clear_error();
            Some(snapshot)
        });
        let Some(snapshot) = snapshot else {
            return Mutation::settled_now(kind, id, MutationOutcome::Noop);
        };
        tracing::debug!(task_id = %id, fields = ?snapshot.fields(), "update applied locally");

        let engine = self.clone();
        let handle = tokio::spawn(async move { engine.settle_update(snapshot, patch, success).await });
        Mutation::applying(kind, id, handle)
    }

    /// Removes a task locally and on the server. Removing a temporary
    /// task is local only.
    pub fn delete(&self, id: TaskId) -> Mutation {
        let removed = self.store().with_tasks(|tasks| {
            let removed = tasks.remove_by_id(&id);
            if removed.is_some() && id.is_temporary() {
                tasks.mark_discarded(id.clone());
            }
            removed
        });
        if removed.is_none() {
            return Mutation::settled_now(MutationKind::Delete, id, MutationOutcome::Noop);
        }
        if id.is_temporary() {
            tracing::debug!(task_id = %id, "discarded unconfirmed task");
            return Mutation::settled_now(MutationKind::Delete, id, MutationOutcome::Confirmed(None));
        }
        tracing::debug!(task_id = %id, "delete applied locally");

        let engine = self.clone();
        let target = id.clone();
        let handle = tokio::spawn(async move { engine.settle_delete(target).await });
        Mutation::applying(MutationKind::Delete, id, handle)
    }

    /// Reloads the list with the applied filters.
    ///
    /// A response is dropped if the filters or the session changed while it
    /// was in flight. Failures are notified once.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] from the list call.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        self.reload().await.inspect_err(|e| self.report(e))
    }

    async fn reload(&self) -> Result<(), ApiError> {
        let token = self.api.tokens().token();
        let filters = self.store().with_tasks(|tasks| {
            tasks.load_start();
            tasks.filters().clone()
        });
        let result = self.api.list_tasks(&filters).await;
        let session_unchanged = self.api.tokens().token() == token;
        self.store().with_tasks(|tasks| match &result {
            Ok(_) if !session_unchanged || tasks.filters() != &filters => {
                tracing::debug!("dropping stale task list");
            }
            Ok(page) => {
                tracing::debug!(count = page.data.len(), total = page.meta.total, "task list loaded");
                tasks.load_succeeded(page.data.clone(), page.meta);
            }
            Err(e) => tasks.load_failed(e.to_string()),
        });
        result.map(drop)
    }

    /// Loads one task into the detail view, refreshing its list copy too.
    ///
    /// An unconfirmed task is shown from its local placeholder without a
    /// server call.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] from the fetch, or `NotFound` for a
    /// temporary id that is no longer listed.
    pub async fn fetch_task(&self, id: &TaskId) -> Result<Task, ApiError> {
        if id.is_temporary() {
            let placeholder = self.store().with_tasks(|tasks| {
                let task = tasks.get(id).cloned();
                tasks.set_current(task.clone());
                task
            });
            tracing::debug!(task_id = %id, found = placeholder.is_some(), "opened unconfirmed task");
            return placeholder.ok_or_else(|| ApiError::NotFound {
                message: "Task not found".into(),
            });
        }
        match self.api.get_task(id).await {
            Ok(task) => {
                self.store().with_tasks(|tasks| {
                    tasks.replace_by_id(id, task.clone());
                    tasks.set_current(Some(task.clone()));
                });
                Ok(task)
            }
            Err(e) => {
                self.store().with_tasks(|tasks| tasks.set_error(e.to_string()));
                self.report(&e);
                Err(e)
            }
        }
    }

    /// Merges `patch` into the applied filters and reloads.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] from the list call.
    pub async fn apply_filters(&self, patch: FilterPatch) -> Result<(), ApiError> {
        self.store().with_tasks(|tasks| tasks.set_filters(patch));
        self.refresh().await
    }

    /// Restores default filters and reloads.
    ///
    /// # Errors
    ///
    /// Returns the [`ApiError`] from the list call.
    pub async fn reset_filters(&self) -> Result<(), ApiError> {
        self.store().with_tasks(TaskState::reset_filters);
        self.refresh().await
    }

    async fn settle_create(&self, temp_id: TaskId, draft: TaskDraft) -> MutationOutcome {
        let server = match self.api.create_task(&draft).await {
            Ok(server) => server,
            Err(e) => {
                tracing::warn!(task_id = %temp_id, error = %e, "create failed, keeping placeholder");
                self.store().with_tasks(|tasks| tasks.take_discarded(&temp_id));
                self.report(&e);
                return MutationOutcome::Unreconciled(e);
            }
        };

        let placement = self.store().with_tasks(|tasks| {
            if tasks.take_discarded(&temp_id) {
                Placement::Discarded
            } else if tasks.replace_by_id(&temp_id, server.clone()) || tasks.contains(&server.id) {
                Placement::InList
            } else {
                Placement::Missing
            }
        });
        tracing::debug!(temp_id = %temp_id, task_id = %server.id, ?placement, "create confirmed");

        match placement {
            Placement::InList => self.store().notifier().success(CREATED),
            Placement::Missing if self.api.tokens().token().is_none() => {
                tracing::debug!(task_id = %server.id, "create settled after sign-out");
            }
            Placement::Missing => {
                self.store().notifier().success(CREATED);
                if let Err(e) = self.reload().await {
                    tracing::warn!(error = %e, "refetch after create failed");
                }
            }
            Placement::Discarded => {
                if let Err(e) = self.api.delete_task(&server.id).await {
                    tracing::warn!(task_id = %server.id, error = %e, "failed to delete discarded task");
                }
            }
        }
        MutationOutcome::Confirmed(Some(server))
    }

    async fn settle_update(&self, snapshot: RollbackSnapshot, patch: TaskPatch, success: String) -> MutationOutcome {
        let id = snapshot.id().clone();
        match self.api.update_task(&id, &patch).await {
            Ok(server) => {
                self.store()
                    .with_tasks(|tasks| tasks.merge_confirmed(&id, &snapshot.fields(), &server));
                tracing::debug!(task_id = %id, "update confirmed");
                self.store().notifier().success(success);
                MutationOutcome::Confirmed(Some(server))
            }
            Err(e) => {
                let restored = self.store().with_tasks(|tasks| snapshot.restore(tasks));
                tracing::warn!(task_id = %id, error = %e, ?restored, "update failed, rolled back");
                self.report(&e);
                MutationOutcome::RolledBack(e)
            }
        }
    }

    async fn settle_delete(&self, id: TaskId) -> MutationOutcome {
        match self.api.delete_task(&id).await {
            Ok(()) => {
                tracing::debug!(task_id = %id, "delete confirmed");
                self.store().notifier().success(DELETED);
                MutationOutcome::Confirmed(None)
            }
            Err(e) => {
                tracing::warn!(task_id = %id, error = %e, "delete failed, refetching");
                if !e.is_unauthorized() {
                    if let Err(reload) = self.reload().await {
                        tracing::warn!(error = %reload, "refetch after failed delete failed");
                    }
                }
                self.report(&e);
                MutationOutcome::Unreconciled(e)
            }
        }
    }

    /// Reports a failure once: validation errors inline, 401s not at all
    /// (the API client already redirected), everything else as a toast.
    fn report(&self, error: &ApiError) {
        match error {
            ApiError::Unauthorized { .. } => {}
            ApiError::Validation { message, errors } => self.store().with_tasks(|tasks| {
                tasks.set_error(message.clone());
                tasks.set_field_errors(errors.clone());
            }),
            other => self.store().notifier().error(other.envelope().message),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Placement {
    InList,
    Missing,
    Discarded,
}
