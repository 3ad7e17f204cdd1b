//! Console configuration.
//!
//! Loaded from environment variables via the `config` crate, with `__` as
//! the nesting separator (e.g. `RECONNECT__MAX_ATTEMPTS=5`).

use serde::Deserialize;

/// Top-level console configuration.
#[derive(Debug, Deserialize)]
pub struct ConsoleConfig {
    /// Push endpoint URL (e.g. `wss://backend.example/api/ws/chat`).
    pub push_url: String,

    /// REST API base URL (e.g. `https://backend.example/api`).
    pub api_url: String,

    /// Bearer token for this session.
    pub token: Option<String>,

    /// Seconds between keep-alive frames.
    #[serde(default = "default_heartbeat_seconds")]
    pub heartbeat_seconds: u64,

    /// Reconnect policy.
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

/// Reconnect policy configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    /// Base delay in seconds; attempt N waits N times this.
    #[serde(default = "default_base_delay_seconds")]
    pub base_delay_seconds: u64,

    /// Upper bound on the delay, in seconds.
    #[serde(default = "default_delay_cap_seconds")]
    pub delay_cap_seconds: u64,

    /// Attempts before giving up.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_heartbeat_seconds() -> u64 {
    30
}

fn default_base_delay_seconds() -> u64 {
    2
}

fn default_delay_cap_seconds() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    10
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay_seconds: default_base_delay_seconds(),
            delay_cap_seconds: default_delay_cap_seconds(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl ConsoleConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::default()
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reconnect_config_has_correct_defaults() {
        let config = ReconnectConfig::default();
        assert_eq!(config.base_delay_seconds, 2);
        assert_eq!(config.delay_cap_seconds, 30);
        assert_eq!(config.max_attempts, 10);
    }
}
