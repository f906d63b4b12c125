use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::error::{AppError, Result};
use crate::utils::{current_timestamp, generate_id};

/// Message type routed to chat notifications.
pub const NOTIFICATION_TYPE: &str = "notification";

/// Keys every envelope on the notifications topic must carry.
const REQUIRED_FIELDS: [&str; 4] = ["id", "type", "payload", "timestamp"];

/// Envelope written to the notifications topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KafkaMessage {
    pub id: String,
    #[serde(rename = "type")]
    pub message_type: String,
    pub payload: Value,
    /// Unix time in milliseconds.
    pub timestamp: i64,
}

impl KafkaMessage {
    pub fn new(message_type: impl Into<String>, payload: Value) -> Self {
        Self {
            id: generate_id(),
            message_type: message_type.into(),
            payload,
            timestamp: current_timestamp(),
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_json(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }

    pub fn is_notification(&self) -> bool {
        self.message_type == NOTIFICATION_TYPE
    }

    pub fn notification_payload(&self) -> Result<NotificationMessage> {
        Ok(NotificationMessage::deserialize(&self.payload)?)
    }
}

/// Payload of a `notification` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct NotificationMessage {
    #[serde(rename = "chatId")]
    pub chat_id: i64,
    pub text: String,
    #[serde(rename = "messageId", default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

/// Checks the envelope shape before it is decoded into [`KafkaMessage`].
/// Only key presence is checked.
pub fn is_valid_kafka_message(raw: &Value) -> bool {
    match raw.as_object() {
        Some(map) => REQUIRED_FIELDS.iter().all(|f| map.contains_key(*f)),
        None => false,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateMessageRequest {
    #[serde(rename = "type")]
    #[schema(example = "notification")]
    pub message_type: String,
    #[schema(value_type = Object, example = json!({"chatId": 123456, "text": "Hello World"}))]
    pub payload: Value,
}

impl CreateMessageRequest {
    pub fn validate(&self) -> Result<()> {
        if self.message_type.is_empty() {
            return Err(AppError::invalid("type is required"));
        }
        if self.payload.is_null() {
            return Err(AppError::invalid("payload is required"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateMessageResponse {
    pub id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self { status: "ok".into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_message_has_id_and_timestamp() {
        let msg = KafkaMessage::new("notification", json!({"chatId": 123456, "text": "Test message"}));
        assert_eq!(msg.message_type, "notification");
        assert!(!msg.id.is_empty());
        assert!(msg.timestamp > 0);
        assert!(!msg.payload.is_null());
    }

    #[test]
    fn json_uses_wire_field_names() {
        let msg = KafkaMessage::new("test", json!({"key": "value"}));
        let raw: Value = serde_json::from_slice(&msg.to_json().unwrap()).unwrap();
        assert_eq!(raw["type"], "test");
        assert_eq!(raw["id"], json!(msg.id));
        assert_eq!(raw["timestamp"], json!(msg.timestamp));
        assert!(is_valid_kafka_message(&raw));
    }

    #[test]
    fn from_json_restores_message() {
        let original = KafkaMessage::new("test", json!({"key": "value"}));
        let parsed = KafkaMessage::from_json(&original.to_json().unwrap()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn notification_detection() {
        assert!(KafkaMessage::new("notification", json!({})).is_notification());
        assert!(!KafkaMessage::new("other", json!({})).is_notification());
    }

    #[test]
    fn notification_payload_decodes() {
        let msg = KafkaMessage::new(
            "notification",
            json!({"chatId": 123456, "text": "Test notification"}),
        );
        let n = msg.notification_payload().unwrap();
        assert_eq!(n.chat_id, 123456);
        assert_eq!(n.text, "Test notification");
        assert_eq!(n.message_id, None);
    }

    #[test]
    fn notification_payload_rejects_wrong_shape() {
        let msg = KafkaMessage::new("notification", json!({"chatId": "abc", "text": "x"}));
        assert!(msg.notification_payload().is_err());
        let msg = KafkaMessage::new("notification", json!({"text": "x"}));
        assert!(msg.notification_payload().is_err());
    }

    #[test]
    fn message_id_omitted_when_absent() {
        let n = NotificationMessage { chat_id: 1, text: "hi".into(), message_id: None };
        let raw = serde_json::to_value(&n).unwrap();
        assert_eq!(raw, json!({"chatId": 1, "text": "hi"}));
    }

    #[test]
    fn envelope_validation() {
        let valid = json!({
            "id": "test-id",
            "type": "test",
            "payload": {},
            "timestamp": 1234567890
        });
        assert!(is_valid_kafka_message(&valid));

        let partial = json!({"id": "test-id", "type": "test"});
        assert!(!is_valid_kafka_message(&partial));

        let nulls = json!({"id": null, "type": null, "payload": null, "timestamp": null});
        assert!(is_valid_kafka_message(&nulls));

        assert!(!is_valid_kafka_message(&json!([1, 2, 3])));
    }

    #[test]
    fn request_validation() {
        let ok: CreateMessageRequest =
            serde_json::from_value(json!({"type": "notification", "payload": {"chatId": 1}})).unwrap();
        assert!(ok.validate().is_ok());

        let empty_type: CreateMessageRequest =
            serde_json::from_value(json!({"type": "", "payload": {}})).unwrap();
        assert!(empty_type.validate().is_err());

        let blank_type: CreateMessageRequest =
            serde_json::from_value(json!({"type": " ", "payload": {}})).unwrap();
        assert!(blank_type.validate().is_ok());

        let null_payload: CreateMessageRequest =
            serde_json::from_value(json!({"type": "notification", "payload": null})).unwrap();
        assert!(null_payload.validate().is_err());

        let missing = serde_json::from_value::<CreateMessageRequest>(json!({"type": "notification"}));
        assert!(missing.is_err());
    }
}
