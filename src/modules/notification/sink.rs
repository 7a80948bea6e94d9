use super::{Notification, Severity};
use crate::{log_error, log_info, log_warn};
use tokio::sync::mpsc;

/// Fire-and-forget receiver of notifications
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the application log
#[derive(Debug, Clone, Default)]
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Info => log_info!("{}", notification.message),
            Severity::Warning => log_warn!("{}", notification.message),
            Severity::Error => log_error!("{}", notification.message),
        }
    }
}

/// Forwards notifications to a channel, e.g. for a UI or a test
#[derive(Debug, Clone)]
pub struct ChannelNotificationSink {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotificationSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelNotificationSink {
    fn notify(&self, notification: Notification) {
        // Nobody listening is not an error
        let _ = self.tx.send(notification);
    }
}
