//! Tracing subscriber setup.

use tracing_subscriber::{fmt, EnvFilter};

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Installs the global subscriber: JSON lines in production, human
/// readable output otherwise. Later calls are no-ops.
pub fn init_tracing(environment: &str) {
    let result = if environment == "production" {
        fmt()
            .json()
            .with_env_filter(env_filter())
            .with_current_span(false)
            .try_init()
    } else {
        fmt().with_env_filter(env_filter()).with_target(false).try_init()
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
