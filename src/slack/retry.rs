//! Rate-limit aware retry for Slack Web API calls.
//!
//! # States
//!
//! ```text
//! ATTEMPTING ──ok──────────────────────────────▶ SUCCEEDED
//!     │ ──non-429 error────────────────────────▶ FAILED_FATAL
//!     │ ──429, attempt == max_retries──────────▶ FAILED_EXHAUSTED
//!     └─429, attempt <  max_retries─▶ RATE_LIMITED_WAITING ──sleep──▶ ATTEMPTING
//! ```
//!
//! The wait is the server's `Retry-After` hint when present, otherwise the
//! current backoff delay. Jitter of up to `±jitter × wait` is applied to
//! the slept duration only; the backoff delay itself grows by
//! `backoff_factor` every round, so its progression is deterministic.
//!
//! Every wait, and the backoff delay itself, saturates at [`MAX_BACKOFF`].
//!
//! Only [`SlackError::RateLimited`] is retried. Timeouts and every other
//! error surface on the first failure.

use std::future::Future;
use std::time::Duration;

use rand::Rng;

use crate::error::{ClientError, SlackError};

/// Upper bound on any single retry wait.
pub const MAX_BACKOFF: Duration = Duration::from_secs(15 * 60);

/// Retry policy for rate-limited calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts are `max_retries + 1`.
    pub max_retries: u32,
    /// Wait before the first retry when Slack gives no hint.
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after each retry round. Must be > 1.
    pub backoff_factor: f64,
    /// Relative jitter in `[0, 1)`.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_secs(5),
            backoff_factor: 2.0,
            jitter: 0.1,
        }
    }
}

impl RetryPolicy {
    /// Create a validated policy.
    pub fn new(
        max_retries: u32,
        initial_delay: Duration,
        backoff_factor: f64,
        jitter: f64,
    ) -> Result<Self, ClientError> {
        if initial_delay.is_zero() {
            return Err(ClientError::InvalidArgument(
                "initial_delay must be greater than zero".to_string(),
            ));
        }
        if !backoff_factor.is_finite() || backoff_factor <= 1.0 {
            return Err(ClientError::InvalidArgument(format!(
                "backoff_factor must be greater than 1, got {backoff_factor}"
            )));
        }
        if !(0.0..1.0).contains(&jitter) {
            return Err(ClientError::InvalidArgument(format!(
                "jitter must be in [0, 1), got {jitter}"
            )));
        }
        Ok(Self {
            max_retries,
            initial_delay,
            backoff_factor,
            jitter,
        })
    }

    /// Same policy with a different retry bound.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Run `call`, retrying on rate limits according to `policy`.
///
/// `operation` only labels log lines. The closure is invoked once per
/// attempt, so it must build a fresh future every time.
pub async fn with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    operation: &str,
    mut call: F,
) -> Result<T, SlackError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SlackError>>,
{
    let mut delay = policy.initial_delay;
    let mut attempt: u32 = 0;

    loop {
        let err = match call().await {
            Ok(value) => {
                if attempt > 0 {
                    tracing::debug!(operation, attempt, "Slack call succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        let SlackError::RateLimited { retry_after, .. } = &err else {
            tracing::debug!(operation, error = %err, "Slack call failed, not retrying");
            return Err(err);
        };

        if attempt >= policy.max_retries {
            tracing::error!(
                operation,
                max_retries = policy.max_retries,
                "Slack rate limit persisted after all retries"
            );
            return Err(err);
        }

        let wait = retry_after.unwrap_or(delay).min(MAX_BACKOFF);
        let sample = if policy.jitter > 0.0 {
            rand::thread_rng().gen_range(-policy.jitter..=policy.jitter)
        } else {
            0.0
        };
        let sleep_for = jittered(wait, sample);

        attempt += 1;
        tracing::warn!(
            operation,
            "Slack rate limited (attempt {}/{}), retrying in {:?}",
            attempt,
            policy.max_retries,
            sleep_for
        );
        tokio::time::sleep(sleep_for).await;
        delay = Duration::try_from_secs_f64(delay.as_secs_f64() * policy.backoff_factor)
            .map_or(MAX_BACKOFF, |next| next.min(MAX_BACKOFF));
    }
}

/// `wait + sample × wait`, clamped to `[0, MAX_BACKOFF]`. `sample` is the
/// drawn jitter fraction.
fn jittered(wait: Duration, sample: f64) -> Duration {
    let secs = wait.as_secs_f64() * (1.0 + sample);
    Duration::try_from_secs_f64(secs.max(0.0))
        .map_or(MAX_BACKOFF, |d| d.min(MAX_BACKOFF))
}
