use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 ",
    "(KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
);

/// Retry, backoff and timeout policy for the fetch client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Timeout for a single attempt
    #[serde(with = "secs")]
    pub timeout: Duration,
    /// Total attempts for transient failures
    pub max_retries: u32,
    /// First generic backoff delay, doubled on each further failure
    #[serde(with = "secs")]
    pub backoff_base: Duration,
    #[serde(with = "secs")]
    pub backoff_max: Duration,
    /// First delay after a 429 without a Retry-After hint
    #[serde(with = "secs")]
    pub rate_limit_base_delay: Duration,
    #[serde(with = "secs")]
    pub rate_limit_max_delay: Duration,
    /// Longest `Retry-After` hint honoured; a longer one ends the fetch
    #[serde(with = "secs")]
    pub rate_limit_max_hint: Duration,
    /// 429 responses tolerated per URL before giving up
    pub max_rate_limit_retries: u32,
    /// Global spacing between consecutive requests
    #[serde(with = "secs")]
    pub min_request_interval: Duration,
    pub user_agent: String,
    pub accept_language: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(20),
            max_retries: 3,
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_secs(30),
            rate_limit_base_delay: Duration::from_secs(2),
            rate_limit_max_delay: Duration::from_secs(60),
            rate_limit_max_hint: Duration::from_secs(300),
            max_rate_limit_retries: 5,
            min_request_interval: Duration::ZERO,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            accept_language: "pt-BR,pt;q=0.9,en-US;q=0.7,en;q=0.6".to_string(),
        }
    }
}

/// Top-level settings handed to the orchestrator and its fetch client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    /// Maximum fetch+extract pipelines in flight
    pub concurrency: usize,
    pub fetch: FetchConfig,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            fetch: FetchConfig::default(),
        }
    }
}

impl ScoutConfig {
    /// Load settings from a JSON file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Zero { field: "concurrency" });
        }
        if self.fetch.max_retries == 0 {
            return Err(ConfigError::Zero { field: "max_retries" });
        }
        Ok(())
    }
}

/// Durations as (fractional) seconds in config files.
mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}
