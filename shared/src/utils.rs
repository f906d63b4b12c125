//! Small helpers used throughout the services.

use chrono::Utc;
use uuid::Uuid;

/// Fresh random message id.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

/// Current unix time in milliseconds.
pub fn current_timestamp() -> i64 {
    Utc::now().timestamp_millis()
}
