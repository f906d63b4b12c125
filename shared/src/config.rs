//! Environment driven configuration shared by all services.
//!
//! Values are read from the process environment (keys are matched
//! case-insensitively). A `.env` file in the working directory is loaded
//! into the environment first when present (see [`bootstrap`]).

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::logging::init_tracing;

/// Port every service falls back to when `PORT` is unset.
pub const DEFAULT_PORT: u16 = 3000;

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_environment() -> String {
    "development".into()
}

fn default_telegram_api_url() -> String {
    "https://api.telegram.org".into()
}

fn default_brokers() -> String {
    "localhost:9092".into()
}

fn default_retry_initial_time_ms() -> u64 {
    100
}

fn default_retry_max_attempts() -> u32 {
    8
}

fn default_notifications_topic() -> String {
    "notifications".into()
}

fn default_dead_letter_topic() -> String {
    "dead-letter".into()
}

fn dotenv_warning<T>(result: Result<T, dotenvy::Error>) -> Option<String> {
    result.err().map(|e| format!("could not read .env file: {e}"))
}

/// Loads `.env` into the process environment. Existing variables win.
/// Returns a warning when the file could not be read; it runs before the
/// subscriber exists, so logging is left to the caller.
pub fn load_dotenv() -> Option<String> {
    dotenv_warning(dotenvy::dotenv())
}

pub fn load_dotenv_from(path: impl AsRef<Path>) -> Option<String> {
    dotenv_warning(dotenvy::from_path(path))
}

/// Service startup: reads `.env` and both config sections, installs the
/// tracing subscriber, then reports an unreadable `.env` through it.
pub fn bootstrap(
    client_id: &str,
    group_id: &str,
) -> Result<(AppConfig, KafkaConfig), config::ConfigError> {
    let dotenv = load_dotenv();
    let app = AppConfig::load()?;
    let kafka = KafkaConfig::load(client_id, group_id)?;
    init_tracing(&app.environment);
    if let Some(warning) = dotenv {
        warn!("{warning}");
    }
    Ok((app, kafka))
}

fn build(source: config::Environment) -> Result<config::Config, config::ConfigError> {
    config::Config::builder().add_source(source).build()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub telegram_bot_token: String,
    #[serde(default = "default_telegram_api_url")]
    pub telegram_api_url: String,
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::from_source(config::Environment::default())
    }

    pub fn from_source(source: config::Environment) -> Result<Self, config::ConfigError> {
        build(source)?.try_deserialize()
    }

    /// Returns `default` when the port was left at the global default, so
    /// services sharing one `.env` do not collide.
    pub fn port_or(&self, default: u16) -> u16 {
        if self.port == DEFAULT_PORT {
            default
        } else {
            self.port
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[derive(Debug, Deserialize)]
struct KafkaEnv {
    #[serde(default = "default_brokers")]
    kafka_brokers: String,
    #[serde(default = "default_retry_initial_time_ms")]
    retry_initial_time_ms: u64,
    #[serde(default = "default_retry_max_attempts")]
    retry_max_attempts: u32,
    #[serde(default = "default_notifications_topic")]
    notifications_topic: String,
    #[serde(default = "default_dead_letter_topic")]
    dead_letter_topic: String,
}

#[derive(Debug, Clone)]
pub struct KafkaConfig {
    pub brokers: Vec<String>,
    pub client_id: String,
    pub group_id: String,
    pub retry_initial_time: Duration,
    pub retry_max_attempts: u32,
    pub notifications_topic: String,
    pub dead_letter_topic: String,
}

impl KafkaConfig {
    /// Loads broker settings for the service identified by `client_id`.
    /// Producers pass an empty `group_id`.
    pub fn load(client_id: &str, group_id: &str) -> Result<Self, config::ConfigError> {
        Self::from_source(config::Environment::default(), client_id, group_id)
    }

    pub fn from_source(
        source: config::Environment,
        client_id: &str,
        group_id: &str,
    ) -> Result<Self, config::ConfigError> {
        let env: KafkaEnv = build(source)?.try_deserialize()?;
        let brokers = env
            .kafka_brokers
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        Ok(Self {
            brokers,
            client_id: client_id.to_string(),
            group_id: group_id.to_string(),
            retry_initial_time: Duration::from_millis(env.retry_initial_time_ms),
            retry_max_attempts: env.retry_max_attempts,
            notifications_topic: env.notifications_topic,
            dead_letter_topic: env.dead_letter_topic,
        })
    }

    pub fn bootstrap_servers(&self) -> String {
        self.brokers.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> config::Environment {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<config::Map<String, String>>();
        config::Environment::default().source(Some(map))
    }

    #[test]
    fn app_defaults() {
        let cfg = AppConfig::from_source(env(&[])).unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.environment, "development");
        assert!(cfg.telegram_bot_token.is_empty());
        assert_eq!(cfg.telegram_api_url, "https://api.telegram.org");
        assert!(!cfg.is_production());
    }

    #[test]
    fn app_reads_uppercase_keys() {
        let cfg = AppConfig::from_source(env(&[
            ("PORT", "8080"),
            ("TELEGRAM_BOT_TOKEN", "123:abc"),
            ("ENVIRONMENT", "production"),
        ]))
        .unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.telegram_bot_token, "123:abc");
        assert!(cfg.is_production());
    }

    #[test]
    fn port_or_only_overrides_default() {
        let cfg = AppConfig::from_source(env(&[])).unwrap();
        assert_eq!(cfg.port_or(3001), 3001);
        let cfg = AppConfig::from_source(env(&[("PORT", "9000")])).unwrap();
        assert_eq!(cfg.port_or(3001), 9000);
    }

    #[test]
    fn missing_dotenv_yields_warning() {
        let path = std::env::temp_dir().join(format!("absent-{}.env", crate::utils::generate_id()));
        let warning = load_dotenv_from(&path).unwrap();
        assert!(warning.starts_with("could not read .env file"), "{warning}");
    }

    #[test]
    fn present_dotenv_is_loaded_quietly() {
        let id = crate::utils::generate_id();
        let key = format!("DOTENV_TEST_{}", id.replace('-', "_").to_uppercase());
        let path = std::env::temp_dir().join(format!("present-{id}.env"));
        std::fs::write(&path, format!("{key}=loaded\n")).unwrap();

        assert_eq!(load_dotenv_from(&path), None);
        assert_eq!(std::env::var(&key).unwrap(), "loaded");
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn bootstrap_loads_both_sections() {
        let (app, kafka) = bootstrap("consumer-service", "notification-group").unwrap();
        assert!(!app.environment.is_empty());
        assert_eq!(kafka.client_id, "consumer-service");
        assert_eq!(kafka.group_id, "notification-group");
    }

    #[test]
    fn kafka_defaults() {
        let cfg = KafkaConfig::from_source(env(&[]), "producer-service", "").unwrap();
        assert_eq!(cfg.brokers, vec!["localhost:9092".to_string()]);
        assert_eq!(cfg.client_id, "producer-service");
        assert!(cfg.group_id.is_empty());
        assert_eq!(cfg.retry_initial_time, Duration::from_millis(100));
        assert_eq!(cfg.retry_max_attempts, 8);
        assert_eq!(cfg.notifications_topic, "notifications");
        assert_eq!(cfg.dead_letter_topic, "dead-letter");
    }

    #[test]
    fn kafka_broker_list_is_split_and_trimmed() {
        let cfg = KafkaConfig::from_source(
            env(&[("KAFKA_BROKERS", "kafka-1:9092, kafka-2:9092,,")]),
            "consumer-service",
            "notification-group",
        )
        .unwrap();
        assert_eq!(cfg.brokers, vec!["kafka-1:9092", "kafka-2:9092"]);
        assert_eq!(cfg.bootstrap_servers(), "kafka-1:9092,kafka-2:9092");
        assert_eq!(cfg.group_id, "notification-group");
    }

    #[test]
    fn kafka_overrides() {
        let cfg = KafkaConfig::from_source(
            env(&[
                ("RETRY_INITIAL_TIME_MS", "250"),
                ("RETRY_MAX_ATTEMPTS", "3"),
                ("NOTIFICATIONS_TOPIC", "alerts"),
                ("DEAD_LETTER_TOPIC", "alerts-dlq"),
            ]),
            "notification-service",
            "telegram-notification-group",
        )
        .unwrap();
        assert_eq!(cfg.retry_initial_time, Duration::from_millis(250));
        assert_eq!(cfg.retry_max_attempts, 3);
        assert_eq!(cfg.notifications_topic, "alerts");
        assert_eq!(cfg.dead_letter_topic, "alerts-dlq");
    }
}
