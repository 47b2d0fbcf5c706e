//! Environment configuration.

use std::env;
use std::time::Duration;

use crate::panel::DEFAULT_REFRESH_INTERVAL_MS;

#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    pub throttle_ms: Option<u64>,
    pub debug: bool,
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            throttle_ms: env_u64_opt("ARTIFACT_STREAM_THROTTLE_MS"),
            debug: env_flag("ARTIFACT_STREAM_DEBUG"),
        }
    }

    /// Panel refresh interval, falling back to the built-in default when the
    /// override is missing or unparsable.
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.throttle_ms.unwrap_or(DEFAULT_REFRESH_INTERVAL_MS))
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|value| value == "1").unwrap_or(false)
}

fn env_u64_opt(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|value| value.trim().parse().ok())
}
