use std::time::Duration;

use secrecy::SecretString;

use crate::config::helpers::{optional_env, parse_optional_env};
use crate::error::ConfigError;

pub const DEFAULT_API_BASE_URL: &str = "https://slack.com/api/";
pub const DEFAULT_EVENTS_TOPIC: &str = "slack_events";

/// Slack workspace identity and API settings.
///
/// Bot tokens are deliberately absent: they are resolved per call by the
/// client manager so an explicit tool argument can override them.
#[derive(Clone)]
pub struct SlackConfig {
    /// Bot user ID (`SLACK_BOT_ID`) used to recognise the bot's own messages.
    pub bot_id: Option<String>,
    /// App ID (`SLACK_APP_ID`).
    pub app_id: Option<String>,
    /// User token (`SLACK_USER_TOKEN`), currently unused by the tools.
    pub user_token: Option<SecretString>,
    /// Signing secret for webhook verification.
    pub signing_secret: Option<SecretString>,
    /// Base URL of the Web API, always ending in `/`.
    pub api_base_url: String,
    /// Queue topic verified events are published on.
    pub events_topic: String,
    /// Per-request HTTP timeout.
    pub http_timeout: Duration,
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("bot_id", &self.bot_id)
            .field("app_id", &self.app_id)
            .field("user_token", &self.user_token.as_ref().map(|_| "[REDACTED]"))
            .field(
                "signing_secret",
                &self.signing_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("api_base_url", &self.api_base_url)
            .field("events_topic", &self.events_topic)
            .field("http_timeout", &self.http_timeout)
            .finish()
    }
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_id: None,
            app_id: None,
            user_token: None,
            signing_secret: None,
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            events_topic: DEFAULT_EVENTS_TOPIC.to_string(),
            http_timeout: Duration::from_secs(30),
        }
    }
}

impl SlackConfig {
    pub(crate) fn resolve() -> Result<Self, ConfigError> {
        let api_base_url = match optional_env("SLACK_API_BASE_URL")? {
            Some(raw) => normalize_base_url(&raw).map_err(|message| ConfigError::InvalidValue {
                key: "SLACK_API_BASE_URL".to_string(),
                message,
            })?,
            None => DEFAULT_API_BASE_URL.to_string(),
        };

        Ok(Self {
            bot_id: optional_env("SLACK_BOT_ID")?,
            app_id: optional_env("SLACK_APP_ID")?,
            user_token: optional_env("SLACK_USER_TOKEN")?.map(SecretString::from),
            signing_secret: optional_env("SLACK_SIGNING_SECRET")?.map(SecretString::from),
            api_base_url,
            events_topic: optional_env("SLACK_EVENTS_TOPIC")?
                .unwrap_or_else(|| DEFAULT_EVENTS_TOPIC.to_string()),
            http_timeout: Duration::from_secs(parse_optional_env("SLACK_HTTP_TIMEOUT_SECS", 30)?),
        })
    }
}

/// Validate a Web API base URL and make sure it ends with `/` so that
/// method names join onto it instead of replacing the last segment.
pub fn normalize_base_url(raw: &str) -> Result<String, String> {
    let mut url = url::Url::parse(raw.trim()).map_err(|e| format!("invalid URL: {e}"))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url.to_string())
}
