use std::time::Duration;

use crate::config::helpers::parse_optional_env;
use crate::error::ConfigError;
use crate::slack::RetryPolicy;

/// Retry settings for rate-limited Slack calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt. `--retry` overrides this.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub backoff_factor: f64,
    pub jitter: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            initial_delay: policy.initial_delay,
            backoff_factor: policy.backoff_factor,
            jitter: policy.jitter,
        }
    }
}

impl RetryConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            max_retries: parse_optional_env("SLACK_RETRY_COUNT", defaults.max_retries)?,
            initial_delay: Duration::from_millis(parse_optional_env(
                "SLACK_RETRY_INITIAL_DELAY_MS",
                defaults.initial_delay.as_millis() as u64,
            )?),
            backoff_factor: parse_optional_env(
                "SLACK_RETRY_BACKOFF_FACTOR",
                defaults.backoff_factor,
            )?,
            jitter: parse_optional_env("SLACK_RETRY_JITTER", defaults.jitter)?,
        };
        config.policy().map_err(|e| ConfigError::InvalidValue {
            key: "SLACK_RETRY_*".to_string(),
            message: e.to_string(),
        })?;
        Ok(config)
    }

    /// Build a validated policy from these settings.
    pub fn policy(&self) -> Result<RetryPolicy, crate::error::ClientError> {
        RetryPolicy::new(
            self.max_retries,
            self.initial_delay,
            self.backoff_factor,
            self.jitter,
        )
    }
}
