//! Logging of engine notifications.
//!
//! There is no chat platform behind this binary, so a delivery is a log line
//! plus the notification itself in the command's output.

use filmswap_core::Notification;

/// Log every notification, skipped deliveries at `debug`.
pub fn dispatch(notifications: &[Notification]) {
    for notification in notifications {
        let recipient = notification.recipient();
        if notification.is_skipped() {
            tracing::debug!(%recipient, "{}", notification.message());
        } else {
            tracing::info!(%recipient, "{}", notification.message());
        }
    }
}
