//! The consume loop shared by the consumer and notification services.

use async_trait::async_trait;
use rdkafka::consumer::StreamConsumer;
use rdkafka::Message;
use tokio::sync::watch;
use tracing::{error, info};

use crate::dto::KafkaMessage;
use crate::error::Result;
use crate::kafka::{decode_envelope, DeadLetter, DeadLetterSink};

/// Business step applied to every decoded envelope.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, message: &KafkaMessage) -> Result<()>;
}

/// Decodes a raw record value and hands the envelope to `handler`.
pub async fn process_payload<H>(handler: &H, payload: Option<&[u8]>) -> Result<()>
where
    H: MessageHandler + ?Sized,
{
    let message = decode_envelope(payload)?;
    info!(
        message_id = %message.id,
        message_type = %message.message_type,
        timestamp = message.timestamp,
        "processing message"
    );
    handler.handle(&message).await
}

/// Processes one record. Failures are forwarded to `dead_letters`; the
/// return value tells whether processing succeeded.
pub async fn handle_delivery<M, H, S>(handler: &H, dead_letters: &S, message: &M) -> bool
where
    M: Message + Sync,
    H: MessageHandler + ?Sized,
    S: DeadLetterSink + ?Sized,
{
    match process_payload(handler, message.payload()).await {
        Ok(()) => true,
        Err(e) => {
            error!(%e, topic = message.topic(), offset = message.offset(), "failed to process message");
            if let Err(e) = dead_letters.publish(DeadLetter::from_message(message)).await {
                error!(%e, "failed to send message to dead letter topic");
            }
            false
        }
    }
}

/// Receives records until `shutdown` flips to `true` or its sender is
/// dropped. A single bad record never stops the loop.
pub async fn run_consumer<H, S>(
    consumer: StreamConsumer,
    handler: &H,
    dead_letters: &S,
    mut shutdown: watch::Receiver<bool>,
) where
    H: MessageHandler + ?Sized,
    S: DeadLetterSink + ?Sized,
{
    info!("starting kafka consume loop");
    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            _ = shutdown.changed() => {
                if shutdown.has_changed().is_err() || *shutdown.borrow() {
                    break;
                }
            }
            received = consumer.recv() => match received.map(|m| m.detach()) {
                Err(e) => error!(%e, "failed to read message"),
                Ok(message) => {
                    handle_delivery(handler, dead_letters, &message).await;
                }
            }
        }
    }
    info!("stopping kafka consumer");
}
