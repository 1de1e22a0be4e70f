//! Player-facing notifications.
//!
//! The core never renders anything. It hands short messages with a severity
//! to a [`Notifier`] and moves on without waiting for a result.

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

/// How a notification should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Neutral information.
    Info,
    /// Something good happened.
    Success,
    /// Something went wrong but play continues.
    Warning,
    /// A failure.
    Error,
}

/// A message for the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Text to show
    pub message: String,
    /// Presentation hint
    pub severity: Severity,
}

/// Receives notifications. Fire-and-forget.
pub trait Notifier: Send + Sync {
    /// Delivers a notification.
    fn notify(&self, message: &str, severity: Severity);
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn notify(&self, message: &str, severity: Severity) {
        (**self).notify(message, severity);
    }
}

/// Writes notifications to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        match severity {
            Severity::Info | Severity::Success => info!(target: "wayfarer::notify", "{message}"),
            Severity::Warning => warn!(target: "wayfarer::notify", "{message}"),
            Severity::Error => error!(target: "wayfarer::notify", "{message}"),
        }
    }
}

/// Publishes notifications on a bounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: Sender<Notification>,
}

impl ChannelNotifier {
    /// Creates a notifier and the receiving end of its channel.
    #[must_use]
    pub fn channel(capacity: usize) -> (Self, Receiver<Notification>) {
        let (sender, receiver) = bounded(capacity);
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        // Non-blocking send - if full, the notification is dropped
        let _ = self.sender.try_send(Notification {
            message: message.to_string(),
            severity,
        });
    }
}

/// Keeps every notification in memory.
#[derive(Debug, Default)]
pub struct NotificationLog {
    entries: Mutex<Vec<Notification>>,
}

impl NotificationLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies out all entries.
    #[must_use]
    pub fn entries(&self) -> Vec<Notification> {
        self.entries.lock().clone()
    }

    /// Removes and returns all entries.
    pub fn drain(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.entries.lock())
    }

    /// Check if any entry contains `text`.
    #[must_use]
    pub fn contains(&self, text: &str) -> bool {
        self.entries.lock().iter().any(|n| n.message.contains(text))
    }

    /// Number of entries with the given severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|n| n.severity == severity)
            .count()
    }
}

impl Notifier for NotificationLog {
    fn notify(&self, message: &str, severity: Severity) {
        self.entries.lock().push(Notification {
            message: message.to_string(),
            severity,
        });
    }
}

/// Sends every notification to several notifiers.
#[derive(Default)]
pub struct FanoutNotifier {
    targets: Vec<Arc<dyn Notifier>>,
}

impl FanoutNotifier {
    /// Creates a notifier with no targets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a target.
    #[must_use]
    pub fn with(mut self, target: Arc<dyn Notifier>) -> Self {
        self.targets.push(target);
        self
    }
}

impl Notifier for FanoutNotifier {
    fn notify(&self, message: &str, severity: Severity) {
        for target in &self.targets {
            target.notify(message, severity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_records_in_order() {
        let log = NotificationLog::new();
        log.notify("first", Severity::Info);
        log.notify("second", Severity::Warning);

        assert!(log.contains("sec"));
        assert_eq!(log.count(Severity::Warning), 1);
        let drained = log.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].message, "first");
        assert!(log.entries().is_empty());
    }

    #[test]
    fn test_channel_drops_when_full() {
        let (notifier, receiver) = ChannelNotifier::channel(1);
        notifier.notify("kept", Severity::Success);
        notifier.notify("dropped", Severity::Success);

        let received: Vec<_> = receiver.try_iter().collect();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].message, "kept");
    }

    #[test]
    fn test_fanout_reaches_every_target() {
        let a = Arc::new(NotificationLog::new());
        let b = Arc::new(NotificationLog::new());
        let fanout = FanoutNotifier::new().with(a.clone()).with(b.clone());
        fanout.notify("hello", Severity::Info);
        assert!(a.contains("hello"));
        assert!(b.contains("hello"));
    }
}
