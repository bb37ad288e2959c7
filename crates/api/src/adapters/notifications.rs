//! Webhook notifications.
//!
//! Delivery to the chat service is not wired up yet; the sender records
//! what would have been posted so operators can see the decision being made.

use async_trait::async_trait;
use opcal_core::NotificationSender;
use opcal_domain::{EventNotification, Result, WebHook};
use tracing::{debug, info};

#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingNotificationSender;

#[async_trait]
impl NotificationSender for LoggingNotificationSender {
    async fn notify(&self, webhook: &WebHook, notification: &EventNotification) -> Result<()> {
        if !webhook.enabled {
            debug!(webhook_id = webhook.id, "webhook disabled, notification dropped");
            return Ok(());
        }
        info!(
            webhook_id = webhook.id,
            webhook = %webhook.name,
            filter = %notification.filter_name,
            event_id = notification.event_id,
            title = %notification.title,
            start = %notification.start,
            "new event notification"
        );
        Ok(())
    }
}
