use async_trait::async_trait;
use rdkafka::message::{Header, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use shared::config::KafkaConfig;
use shared::dto::{CreateMessageRequest, CreateMessageResponse, KafkaMessage};
use shared::error::{AppError, Result};
use shared::kafka::{create_producer, MESSAGE_TYPE_HEADER, QUEUE_TIMEOUT};
use std::time::Duration;
use tracing::{error, info, warn};

/// Publishes API requests to the broker.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    async fn send_message(&self, request: &CreateMessageRequest) -> Result<CreateMessageResponse>;
}

pub struct KafkaService {
    producer: FutureProducer,
    config: KafkaConfig,
}

impl KafkaService {
    pub fn new(config: KafkaConfig) -> Result<Self> {
        let producer = create_producer(&config)?;
        Ok(Self { producer, config })
    }

    pub fn topic(&self) -> &str {
        &self.config.notifications_topic
    }

    /// Flushes in-flight records before the process exits.
    pub fn close(&self) {
        if let Err(e) = self.producer.flush(Duration::from_secs(10)) {
            warn!(%e, "failed to flush kafka producer");
        }
    }
}

/// Wraps the request in a fresh envelope and serializes it.
pub fn envelope(request: &CreateMessageRequest) -> Result<(KafkaMessage, Vec<u8>)> {
    let message = KafkaMessage::new(request.message_type.clone(), request.payload.clone());
    let bytes = message.to_json().map_err(|e| {
        error!(%e, "failed to marshal message");
        e
    })?;
    Ok((message, bytes))
}

#[async_trait]
impl MessagePublisher for KafkaService {
    async fn send_message(&self, request: &CreateMessageRequest) -> Result<CreateMessageResponse> {
        let (message, bytes) = envelope(request)?;
        let headers = OwnedHeaders::new().insert(Header {
            key: MESSAGE_TYPE_HEADER,
            value: Some(request.message_type.as_str()),
        });
        let record = FutureRecord::to(self.topic())
            .key(message.id.as_str())
            .payload(&bytes)
            .headers(headers);

        let delivery = self.producer.send(record, QUEUE_TIMEOUT).await;
        match delivery {
            Ok((partition, offset)) => {
                info!(
                    message_id = %message.id,
                    message_type = %request.message_type,
                    partition,
                    offset,
                    "message sent successfully"
                );
                Ok(CreateMessageResponse { id: message.id })
            }
            Err((e, _)) => {
                error!(
                    %e,
                    message_id = %message.id,
                    message_type = %request.message_type,
                    "failed to send message to kafka"
                );
                Err(AppError::Kafka(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn kafka_config() -> KafkaConfig {
        KafkaConfig {
            brokers: vec!["localhost:9092".into()],
            client_id: "test-producer".into(),
            group_id: String::new(),
            retry_initial_time: Duration::from_millis(100),
            retry_max_attempts: 8,
            notifications_topic: "test-notifications".into(),
            dead_letter_topic: "test-dead-letter".into(),
        }
    }

    fn request() -> CreateMessageRequest {
        CreateMessageRequest {
            message_type: "notification".into(),
            payload: json!({"chatId": 123456, "text": "Test message"}),
        }
    }

    #[test]
    fn new_service_uses_notifications_topic() {
        let service = KafkaService::new(kafka_config()).unwrap();
        assert_eq!(service.topic(), "test-notifications");
    }

    #[test]
    fn envelope_carries_request() {
        let (message, bytes) = envelope(&request()).unwrap();
        assert_eq!(message.message_type, "notification");
        assert_eq!(message.payload["text"], "Test message");
        let decoded = KafkaMessage::from_json(&bytes).unwrap();
        assert_eq!(decoded, message);
    }

    #[tokio::test]
    #[ignore = "requires a running Kafka broker"]
    async fn sends_to_broker() {
        let service = KafkaService::new(kafka_config()).unwrap();
        let response = service.send_message(&request()).await.unwrap();
        assert!(!response.id.is_empty());
        service.close();
    }
}
