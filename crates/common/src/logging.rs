//! Tracing subscriber bootstrap
//!
//! Output is JSON, one event per line. The filter is read from `LOG_LEVEL`,
//! then `RUST_LOG`, and falls back to `info`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable consulted before `RUST_LOG`.
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";

/// Build the level filter from the environment.
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_LEVEL_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber.
///
/// Returns an error if a global subscriber is already installed, which
/// happens when a host application set up its own tracing first.
pub fn init() -> Result<(), TryInitError> {
    tracing_subscriber::registry()
        .with(env_filter())
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_reports_error_instead_of_panicking() {
        let _ = init();
        assert!(init().is_err(), "a second global subscriber must be refused");
    }

    #[test]
    fn env_filter_builds_without_env() {
        let filter = env_filter();
        assert!(!filter.to_string().is_empty());
    }
}
