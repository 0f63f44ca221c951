//! Fire-and-forget notification fan-out to the platform shell.

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use shared::protocol::Notification;

/// One-way channel to the shell. Sends never block and never fail the
/// caller; a full or disconnected channel is logged and dropped.
#[derive(Clone)]
pub struct NotificationSender {
    tx: Sender<Notification>,
}

impl NotificationSender {
    pub fn send(&self, notification: Notification) {
        match self.tx.try_send(notification) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                tracing::warn!(?dropped, "notification channel full; dropping");
            }
            Err(TrySendError::Disconnected(dropped)) => {
                tracing::warn!(?dropped, "notification channel disconnected; dropping");
            }
        }
    }
}

pub fn notification_channel(capacity: usize) -> (NotificationSender, Receiver<Notification>) {
    let (tx, rx) = bounded(capacity);
    (NotificationSender { tx }, rx)
}
