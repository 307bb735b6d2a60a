//! Seam between tasks and whoever is listening to them.

use serde::Serialize;

use crate::paths::Category;

/// A developer-facing report of a file that failed to transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Short label, e.g. "SCSS Error"
    pub title: String,

    /// Underlying error message
    pub message: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Receiver of task side effects.
///
/// Tasks call [`BuildEvents::reload`] once their writes are done and
/// [`BuildEvents::notify`] for every recoverable per-file failure.
pub trait BuildEvents: Send + Sync {
    /// Output for `category` changed; connected clients should refresh.
    fn reload(&self, category: Category);

    /// A file failed to transform but the task carried on.
    fn notify(&self, notification: &Notification);
}

/// Events sink for one-shot runs: everything goes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEvents;

impl BuildEvents for LogEvents {
    fn reload(&self, category: Category) {
        tracing::debug!(task = %category, "Output updated");
    }

    fn notify(&self, notification: &Notification) {
        tracing::error!("{}: {}", notification.title, notification.message);
    }
}
