//! Notification display seam.

use std::sync::Arc;
use tokio::sync::mpsc;
use vitrine_types::Notification;

/// Displays notifications to the operator.
///
/// Called synchronously from the view's event loop, so implementations must
/// not block.
pub trait Notifier: Send + Sync + 'static {
    /// Shows one notification.
    fn notify(&self, notification: Notification);
}

impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    fn notify(&self, notification: Notification) {
        (**self).notify(notification);
    }
}

/// Writes notifications to the log at `info`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        tracing::info!(
            title = %notification.title,
            description = notification.description.as_deref().unwrap_or(""),
            "notification"
        );
    }
}

/// Forwards notifications to a channel, for a UI task to render.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    /// Creates a notifier and the receiver its notifications arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            tracing::debug!("notification receiver dropped; discarding notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_notifier_forwards_in_order() {
        let (notifier, mut rx) = ChannelNotifier::new();
        notifier.notify(Notification::new("a"));
        notifier.notify(Notification::new("b").with_description(Some("c".to_string())));

        assert_eq!(rx.try_recv().unwrap(), Notification::new("a"));
        assert_eq!(rx.try_recv().unwrap().description.as_deref(), Some("c"));
    }

    #[test]
    fn channel_notifier_survives_dropped_receiver() {
        let (notifier, rx) = ChannelNotifier::new();
        drop(rx);
        notifier.notify(Notification::new("ignored"));
    }
}
