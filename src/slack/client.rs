//! Slack client: a token-bound API handle plus an optional retry policy.

use std::sync::Arc;

use serde_json::{Value, json};

use crate::error::SlackError;
use crate::slack::api::SlackApi;
use crate::slack::retry::{RetryPolicy, with_retry};

/// A Slack client bound to one token.
///
/// Retry-enabled clients route every call through [`with_retry`]; plain
/// clients call the API once.
pub struct SlackClient {
    api: Arc<dyn SlackApi>,
    retry: Option<RetryPolicy>,
    token_hint: String,
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("token", &self.token_hint)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Options for `conversations.history`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryQuery {
    pub limit: Option<u32>,
    pub oldest: Option<String>,
    pub latest: Option<String>,
    pub inclusive: bool,
}

impl SlackClient {
    /// Client that calls the API once per request.
    pub fn plain(api: Arc<dyn SlackApi>, token_hint: impl Into<String>) -> Self {
        Self {
            api,
            retry: None,
            token_hint: token_hint.into(),
        }
    }

    /// Client that retries rate-limited calls per `policy`.
    pub fn with_retry(
        api: Arc<dyn SlackApi>,
        policy: RetryPolicy,
        token_hint: impl Into<String>,
    ) -> Self {
        Self {
            api,
            retry: Some(policy),
            token_hint: token_hint.into(),
        }
    }

    pub fn uses_retry(&self) -> bool {
        self.retry.is_some()
    }

    pub fn retry_policy(&self) -> Option<&RetryPolicy> {
        self.retry.as_ref()
    }

    /// Last characters of the token, safe for logs.
    pub fn token_hint(&self) -> &str {
        &self.token_hint
    }

    /// Call any Web API method.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, SlackError> {
        match &self.retry {
            Some(policy) => {
                with_retry(policy, method, || self.api.call(method, params.clone())).await
            }
            None => self.api.call(method, params).await,
        }
    }

    /// `chat.postMessage`, optionally as a thread reply.
    pub async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<Value, SlackError> {
        let mut params = json!({ "channel": channel, "text": text });
        if let Some(ts) = thread_ts {
            params["thread_ts"] = Value::String(ts.to_string());
        }
        self.call("chat.postMessage", params).await
    }

    /// `conversations.replies` for one thread.
    pub async fn conversations_replies(
        &self,
        channel: &str,
        thread_ts: &str,
        limit: u32,
    ) -> Result<Value, SlackError> {
        self.call(
            "conversations.replies",
            json!({ "channel": channel, "ts": thread_ts, "limit": limit }),
        )
        .await
    }

    /// `conversations.history` for a channel.
    pub async fn conversations_history(
        &self,
        channel: &str,
        query: &HistoryQuery,
    ) -> Result<Value, SlackError> {
        let mut params = json!({ "channel": channel, "inclusive": query.inclusive });
        if let Some(limit) = query.limit {
            params["limit"] = json!(limit);
        }
        if let Some(oldest) = &query.oldest {
            params["oldest"] = json!(oldest);
        }
        if let Some(latest) = &query.latest {
            params["latest"] = json!(latest);
        }
        self.call("conversations.history", params).await
    }

    /// `reactions.add` for a single emoji name (without colons).
    pub async fn reactions_add(
        &self,
        channel: &str,
        timestamp: &str,
        name: &str,
    ) -> Result<Value, SlackError> {
        self.call(
            "reactions.add",
            json!({ "channel": channel, "timestamp": timestamp, "name": name }),
        )
        .await
    }

    /// `emoji.list` for the workspace's custom emoji.
    pub async fn emoji_list(&self, include_categories: bool) -> Result<Value, SlackError> {
        self.call(
            "emoji.list",
            json!({ "include_categories": include_categories }),
        )
        .await
    }
}
