//! Drag-and-drop between board columns.
//!
//! A pure state machine: callers feed it drag events and, on drop, get back
//! the status change to issue (if any). It never touches the store.

use taskdeck_proto::task::{TaskId, TaskStatus};

/// The card being dragged and the column it was lifted from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragItem {
    pub id: TaskId,
    pub source: TaskStatus,
}

/// Drop effect advertised while hovering a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropEffect {
    Move,
}

/// A completed drop that should become a status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub id: TaskId,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragState {
    #[default]
    Idle,
    Dragging {
        item: DragItem,
        hovered: Option<TaskStatus>,
    },
}

impl DragState {
    /// Lifts card `id` out of column `source`, replacing any drag already
    /// in progress.
    pub fn drag_start(&mut self, id: TaskId, source: TaskStatus) {
        tracing::trace!(task_id = %id, %source, "drag start");
        *self = Self::Dragging {
            item: DragItem { id, source },
            hovered: None,
        };
    }

    /// Hovers `column`. The source column is never a drop target.
    pub fn drag_enter(&mut self, column: TaskStatus) {
        if let Self::Dragging { item, hovered } = self {
            if column != item.source {
                *hovered = Some(column);
            }
        }
    }

    /// Acknowledges a drag-over; the only supported effect is a move.
    #[must_use]
    pub const fn drag_over(&self) -> DropEffect {
        DropEffect::Move
    }

    /// Ends the drag. Returns the status change iff a column other than the
    /// source is hovered; the state resets either way.
    pub fn drag_end(&mut self) -> Option<StatusChange> {
        match std::mem::take(self) {
            Self::Dragging {
                item,
                hovered: Some(status),
            } if status != item.source => Some(StatusChange {
                id: item.id,
                status,
            }),
            _ => None,
        }
    }

    /// Abandons the drag without emitting anything.
    pub fn cancel(&mut self) {
        *self = Self::Idle;
    }

    /// The card being dragged.
    #[must_use]
    pub const fn item(&self) -> Option<&DragItem> {
        match self {
            Self::Idle => None,
            Self::Dragging { item, .. } => Some(item),
        }
    }

    /// The hovered column.
    #[must_use]
    pub const fn hovered(&self) -> Option<TaskStatus> {
        match self {
            Self::Idle => None,
            Self::Dragging { hovered, .. } => *hovered,
        }
    }

    /// Whether card `id` should render as lifted.
    #[must_use]
    pub fn is_lifted(&self, id: &TaskId) -> bool {
        self.item().is_some_and(|item| &item.id == id)
    }

    /// Whether `column` should render as the drop target.
    #[must_use]
    pub fn is_drop_target(&self, column: TaskStatus) -> bool {
        self.hovered() == Some(column)
    }
}
