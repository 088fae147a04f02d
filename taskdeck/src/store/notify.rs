//! Non-blocking notifications from the state layer to the UI.

use std::fmt;

use tokio::sync::mpsc;

/// Severity of a [`Notification`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    /// An operation completed.
    Success,
    /// An operation failed.
    Error,
    /// Neutral information.
    Info,
}

/// A toast-style message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// A top-level screen the UI can be sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Surface {
    /// Sign-in form.
    Login,
    /// Kanban board.
    Board,
}

/// Events emitted by the state layer for the UI loop to drain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Show a notification.
    Notify(Notification),
    /// Navigate to a surface.
    Redirect(Surface),
}

/// Sending half of the UI event channel.
///
/// Sends never block: when the channel is full or closed the event is
/// dropped with a warning.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::Sender<UiEvent>,
}

impl Notifier {
    /// Creates a notifier and its receiving half.
    #[must_use]
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<UiEvent>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }

    /// Emits an arbitrary event.
    pub fn emit(&self, event: UiEvent) {
        if let Err(e) = self.tx.try_send(event) {
            tracing::warn!(error = %e, "dropping UI event");
        }
    }

    /// Emits a success notification.
    pub fn success(&self, message: impl Into<String>) {
        self.notify(NotificationLevel::Success, message);
    }

    /// Emits an error notification.
    pub fn error(&self, message: impl Into<String>) {
        self.notify(NotificationLevel::Error, message);
    }

    /// Emits a notification at `level`.
    pub fn notify(&self, level: NotificationLevel, message: impl Into<String>) {
        self.emit(UiEvent::Notify(Notification {
            level,
            message: message.into(),
        }));
    }
}
