//! Field-level rollback snapshots.

use taskdeck_proto::task::{Task, TaskField, TaskId, TaskPatch};

use crate::store::TaskState;

/// Pre-mutation values of exactly the fields an update touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackSnapshot {
    id: TaskId,
    previous: TaskPatch,
    applied: TaskPatch,
}

impl RollbackSnapshot {
    /// Captures `task`'s current values for the fields in `patch`.
    #[must_use]
    pub fn capture(task: &Task, patch: &TaskPatch) -> Self {
        Self {
            id: task.id.clone(),
            previous: TaskPatch::capture(task, &patch.fields()),
            applied: patch.clone(),
        }
    }

    /// The task this snapshot belongs to.
    #[must_use]
    pub const fn id(&self) -> &TaskId {
        &self.id
    }

    /// Fields covered by this snapshot.
    #[must_use]
    pub fn fields(&self) -> Vec<TaskField> {
        self.applied.fields()
    }

    /// Restores every captured field that still shows the value this
    /// mutation wrote. A field overwritten by a later mutation keeps the
    /// later value. Returns the fields that were restored.
    pub fn restore(&self, state: &mut TaskState) -> Vec<TaskField> {
        let Some(task) = state.get(&self.id) else {
            return Vec::new();
        };
        let untouched: Vec<TaskField> = self
            .applied
            .fields()
            .into_iter()
            .filter(|field| task.field_value(*field) == self.applied.restricted_to(&[*field]))
            .collect();
        state.patch_by_id(&self.id, &self.previous.restricted_to(&untouched));
        untouched
    }
}
