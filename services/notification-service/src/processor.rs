use async_trait::async_trait;
use shared::consumer::MessageHandler;
use shared::dto::KafkaMessage;
use shared::error::Result;
use std::sync::Arc;
use tracing::{info, warn};

use crate::telegram::NotificationSender;

/// Forwards `notification` messages to a chat. Anything else is skipped.
pub struct TelegramDispatcher {
    sender: Arc<dyn NotificationSender>,
}

impl TelegramDispatcher {
    pub fn new(sender: Arc<dyn NotificationSender>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl MessageHandler for TelegramDispatcher {
    async fn handle(&self, message: &KafkaMessage) -> Result<()> {
        if !message.is_notification() {
            warn!(message_type = %message.message_type, "received non-notification message");
            return Ok(());
        }
        info!(message_id = %message.id, "processing notification");
        let notification = message.notification_payload()?;
        self.sender
            .send_message(notification.chat_id, &notification.text)
            .await
    }
}
