//! Kafka plumbing shared across services: topic administration, client
//! construction, envelope decoding and dead-letter forwarding.

use async_trait::async_trait;
use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication};
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::message::{Header, Headers, Message, OwnedHeaders};
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::KafkaConfig;
use crate::dto::{is_valid_kafka_message, KafkaMessage};
use crate::error::{AppError, Result};
use crate::utils::current_timestamp;

/// Header carrying the `type` of a produced envelope.
pub const MESSAGE_TYPE_HEADER: &str = "message-type";
/// Header appended to dead-lettered messages (unix ms).
pub const ERROR_TIMESTAMP_HEADER: &str = "error-timestamp";

/// How long a produce call may wait for space in the local queue.
pub const QUEUE_TIMEOUT: Duration = Duration::from_secs(5);

/// Ensure that the given Kafka topics exist.
///
/// Attempts to create each topic with a single partition and replication
/// factor 1. If the topic already exists the error is ignored.
pub async fn ensure_topics(broker: &str, topics: &[&str]) -> std::result::Result<(), KafkaError> {
    let admin: AdminClient<_> = ClientConfig::new()
        .set("bootstrap.servers", broker)
        .create()?;
    let new_topics: Vec<NewTopic> = topics
        .iter()
        .map(|t| NewTopic::new(t, 1, TopicReplication::Fixed(1)))
        .collect();
    let results = admin
        .create_topics(new_topics.iter(), &AdminOptions::new())
        .await?;
    for result in results {
        match result {
            Ok(name) => info!(topic = %name, "topic created"),
            Err((name, RDKafkaErrorCode::TopicAlreadyExists)) => {
                info!(topic = %name, "topic already exists")
            }
            Err((name, err)) => warn!(topic = %name, %err, "failed to create topic"),
        }
    }
    Ok(())
}

fn base_client_config(cfg: &KafkaConfig) -> ClientConfig {
    let mut client = ClientConfig::new();
    client
        .set("bootstrap.servers", cfg.bootstrap_servers())
        .set("client.id", &cfg.client_id);
    client
}

/// Producer that waits for the partition leader's acknowledgement and
/// retries transient send failures per the configured policy.
pub fn create_producer(cfg: &KafkaConfig) -> Result<FutureProducer> {
    let producer = base_client_config(cfg)
        .set("acks", "1")
        .set("message.send.max.retries", cfg.retry_max_attempts.to_string())
        .set("retry.backoff.ms", cfg.retry_initial_time.as_millis().to_string())
        .create()?;
    Ok(producer)
}

/// Consumer joined to `cfg.group_id` and subscribed to the notifications topic.
pub fn create_consumer(cfg: &KafkaConfig) -> Result<StreamConsumer> {
    let consumer: StreamConsumer = base_client_config(cfg)
        .set("group.id", &cfg.group_id)
        .set("enable.auto.commit", "true")
        .set("auto.offset.reset", "earliest")
        .create()?;
    consumer.subscribe(&[cfg.notifications_topic.as_str()])?;
    Ok(consumer)
}

/// Validates a raw record value and decodes it into an envelope.
pub fn decode_envelope(payload: Option<&[u8]>) -> Result<KafkaMessage> {
    let data = match payload {
        Some(d) if !d.is_empty() => d,
        _ => return Err(AppError::invalid("empty message value")),
    };
    let raw: Value = serde_json::from_slice(data)
        .map_err(|e| AppError::invalid(format!("failed to unmarshal message: {e}")))?;
    if !is_valid_kafka_message(&raw) {
        return Err(AppError::invalid("invalid message format"));
    }
    serde_json::from_value(raw)
        .map_err(|e| AppError::invalid(format!("failed to parse kafka message: {e}")))
}

/// A failed record as it will be written to the dead-letter topic.
#[derive(Debug, Clone, PartialEq)]
pub struct DeadLetter {
    pub key: Option<Vec<u8>>,
    pub payload: Option<Vec<u8>>,
    pub headers: Vec<(String, Option<Vec<u8>>)>,
}

impl DeadLetter {
    /// Copies key, value and headers of `message` and appends the
    /// `error-timestamp` header.
    pub fn from_message<M: Message>(message: &M) -> Self {
        let mut headers: Vec<(String, Option<Vec<u8>>)> = message
            .headers()
            .map(|h| {
                h.iter()
                    .map(|header| (header.key.to_string(), header.value.map(<[u8]>::to_vec)))
                    .collect()
            })
            .unwrap_or_default();
        headers.push((
            ERROR_TIMESTAMP_HEADER.to_string(),
            Some(current_timestamp().to_string().into_bytes()),
        ));
        Self {
            key: message.key().map(<[u8]>::to_vec),
            payload: message.payload().map(<[u8]>::to_vec),
            headers,
        }
    }

    pub fn header(&self, key: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_deref())
    }

    fn owned_headers(&self) -> OwnedHeaders {
        self.headers.iter().fold(OwnedHeaders::new(), |acc, (key, value)| {
            acc.insert(Header {
                key: key.as_str(),
                value: value.as_ref(),
            })
        })
    }
}

/// Destination for records that could not be processed.
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    async fn publish(&self, dead_letter: DeadLetter) -> Result<()>;
}

/// Writes dead letters to the configured dead-letter topic.
pub struct DeadLetterWriter {
    producer: FutureProducer,
    topic: String,
}

impl DeadLetterWriter {
    pub fn new(producer: FutureProducer, topic: impl Into<String>) -> Self {
        Self {
            producer,
            topic: topic.into(),
        }
    }

    pub fn from_config(cfg: &KafkaConfig) -> Result<Self> {
        Ok(Self::new(create_producer(cfg)?, &cfg.dead_letter_topic))
    }

    pub fn flush(&self, timeout: Duration) {
        use rdkafka::producer::Producer;
        if let Err(e) = self.producer.flush(timeout) {
            warn!(%e, "failed to flush dead letter producer");
        }
    }
}

#[async_trait]
impl DeadLetterSink for DeadLetterWriter {
    async fn publish(&self, dead_letter: DeadLetter) -> Result<()> {
        let mut record = FutureRecord::<Vec<u8>, Vec<u8>>::to(&self.topic)
            .headers(dead_letter.owned_headers());
        if let Some(key) = &dead_letter.key {
            record = record.key(key);
        }
        if let Some(payload) = &dead_letter.payload {
            record = record.payload(payload);
        }
        self.producer
            .send(record, QUEUE_TIMEOUT)
            .await
            .map_err(|(e, _)| AppError::Kafka(e))?;
        info!(topic = %self.topic, "message moved to dead letter topic");
        Ok(())
    }
}
