//! Raw Slack Web API transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;

use crate::config::SlackConfig;
use crate::error::{ConfigError, SlackError};
use crate::slack::retry::MAX_BACKOFF;

/// A single Web API method call.
///
/// Implementations return the decoded response body only when Slack
/// reports `"ok": true`, and classify failures into [`SlackError`] so the
/// retry wrapper can tell rate limits apart from everything else.
#[async_trait]
pub trait SlackApi: Send + Sync {
    async fn call(&self, method: &str, params: Value) -> Result<Value, SlackError>;
}

/// Builds a [`SlackApi`] bound to one token.
pub trait SlackApiFactory: Send + Sync {
    fn build(&self, token: SecretString) -> Arc<dyn SlackApi>;
}

/// `reqwest` implementation of [`SlackApi`].
pub struct HttpSlackApi {
    http: reqwest::Client,
    base_url: url::Url,
    token: SecretString,
}

impl HttpSlackApi {
    pub fn new(http: reqwest::Client, base_url: url::Url, token: SecretString) -> Self {
        Self {
            http,
            base_url,
            token,
        }
    }
}

#[async_trait]
impl SlackApi for HttpSlackApi {
    async fn call(&self, method: &str, params: Value) -> Result<Value, SlackError> {
        let url = self
            .base_url
            .join(method)
            .map_err(|e| SlackError::Http {
                method: method.to_string(),
                reason: format!("invalid method URL: {e}"),
            })?;

        let response = self
            .http
            .post(url)
            .bearer_auth(self.token.expose_secret())
            .form(&form_fields(&params))
            .send()
            .await
            .map_err(|e| SlackError::Http {
                method: method.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            return Err(SlackError::RateLimited {
                method: method.to_string(),
                retry_after,
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SlackError::Http {
                method: method.to_string(),
                reason: format!("HTTP {}: {}", status, truncate(&body, 200)),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SlackError::InvalidResponse {
                method: method.to_string(),
                reason: e.to_string(),
            })?;
        check_ok(method, body)
    }
}

/// Interpret Slack's `ok` envelope.
pub(crate) fn check_ok(method: &str, body: Value) -> Result<Value, SlackError> {
    match body.get("ok").and_then(Value::as_bool) {
        Some(true) => Ok(body),
        Some(false) => {
            let error = body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown_error")
                .to_string();
            // Slack occasionally reports throttling in the envelope with HTTP 200.
            if error == "ratelimited" {
                return Err(SlackError::RateLimited {
                    method: method.to_string(),
                    retry_after: None,
                });
            }
            Err(SlackError::Api {
                method: method.to_string(),
                error,
            })
        }
        None => Err(SlackError::InvalidResponse {
            method: method.to_string(),
            reason: "response has no boolean 'ok' field".to_string(),
        }),
    }
}

/// Flatten a JSON object into form fields. Nested values are sent as JSON text.
fn form_fields(params: &Value) -> Vec<(String, String)> {
    let Some(object) = params.as_object() else {
        return Vec::new();
    };
    object
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| {
            let value = match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            (k.clone(), value)
        })
        .collect()
}

/// `Retry-After` is whole seconds for the Web API. Capped at [`MAX_BACKOFF`].
fn parse_retry_after(raw: &str) -> Option<Duration> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .map(|secs| Duration::from_secs(secs).min(MAX_BACKOFF))
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Factory producing [`HttpSlackApi`] clients that share one connection pool.
pub struct HttpSlackApiFactory {
    http: reqwest::Client,
    base_url: url::Url,
}

impl HttpSlackApiFactory {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ConfigError> {
        let base_url = url::Url::parse(base_url).map_err(|e| ConfigError::InvalidValue {
            key: "SLACK_API_BASE_URL".to_string(),
            message: e.to_string(),
        })?;
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("slack-mcp/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                key: "SLACK_HTTP_TIMEOUT_SECS".to_string(),
                message: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self { http, base_url })
    }

    pub fn from_config(config: &SlackConfig) -> Result<Self, ConfigError> {
        Self::new(&config.api_base_url, config.http_timeout)
    }
}

impl SlackApiFactory for HttpSlackApiFactory {
    fn build(&self, token: SecretString) -> Arc<dyn SlackApi> {
        Arc::new(HttpSlackApi::new(
            self.http.clone(),
            self.base_url.clone(),
            token,
        ))
    }
}
