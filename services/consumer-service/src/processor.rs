use async_trait::async_trait;
use shared::consumer::MessageHandler;
use shared::dto::KafkaMessage;
use shared::error::Result;
use tracing::{info, warn};

/// Logs every notification it receives. Other message types are
/// acknowledged with a warning.
pub struct NotificationLogger;

#[async_trait]
impl MessageHandler for NotificationLogger {
    async fn handle(&self, message: &KafkaMessage) -> Result<()> {
        if !message.is_notification() {
            warn!(message_type = %message.message_type, "unknown message type");
            return Ok(());
        }
        let notification = message.notification_payload()?;
        info!(
            message_id = %message.id,
            chat_id = notification.chat_id,
            text = %notification.text,
            "sending notification"
        );
        Ok(())
    }
}
