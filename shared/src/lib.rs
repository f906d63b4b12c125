//! Building blocks shared by the producer, consumer and notification
//! services: the message envelope, configuration loading, error types,
//! logging setup, Kafka helpers and the consume loop.

pub mod config;
pub mod consumer;
pub mod dto;
pub mod error;
pub mod kafka;
pub mod logging;
pub mod utils;
