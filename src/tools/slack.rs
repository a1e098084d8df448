//! Slack tools exposed over MCP.
//!
//! Every tool takes an optional `token`; without one the client manager
//! falls back to `SLACK_BOT_TOKEN` / `SLACK_TOKEN`. Clients are fetched in
//! retry mode, so rate-limited calls back off before the tool gives up.
//! Slack failures come back as `{"ok": false, "error": ...}` results rather
//! than tool errors.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::SlackError;
use crate::slack::{ClientManager, HistoryQuery, SlackClient};
use crate::tools::registry::ToolRegistry;
use crate::tools::tool::{
    Tool, ToolError, ToolOutput, optional_bool, optional_str, optional_u32, require_str,
    require_str_array,
};

/// Default page size for history and thread reads.
pub const DEFAULT_MESSAGE_LIMIT: u32 = 100;

/// Retrying calls may sleep through several backoff rounds.
const SLACK_TOOL_TIMEOUT: Duration = Duration::from_secs(180);

fn token_property() -> Value {
    json!({
        "type": "string",
        "description": "Slack bot token. Defaults to SLACK_BOT_TOKEN or SLACK_TOKEN."
    })
}

fn channel_property() -> Value {
    json!({
        "type": "string",
        "description": "Channel ID (e.g. C12345678) or name with '#' prefix"
    })
}

/// Body reported to the caller when a Slack call fails.
pub fn failure_body(err: &SlackError) -> Value {
    match err {
        SlackError::Api { error, .. } => json!({ "ok": false, "error": error }),
        other => json!({ "ok": false, "error": other.to_string() }),
    }
}

fn finish(result: Result<Value, SlackError>, start: Instant) -> ToolOutput {
    let body = result.unwrap_or_else(|e| {
        tracing::warn!("Slack call failed: {}", e);
        failure_body(&e)
    });
    ToolOutput::success(body, start.elapsed())
}

/// Resolve the client for a call's optional `token` parameter.
async fn client_for(
    clients: &ClientManager,
    params: &Value,
) -> Result<Arc<SlackClient>, SlackError> {
    let token = optional_str(params, "token").ok().flatten();
    Ok(clients.get_client(token, true).await?)
}

/// Fold per-item results into `{ok, responses}`; `ok` only if every item succeeded.
fn batch_body(results: Vec<Result<Value, SlackError>>) -> Value {
    let mut all_ok = true;
    let responses: Vec<Value> = results
        .into_iter()
        .map(|r| match r {
            Ok(body) => body,
            Err(e) => {
                all_ok = false;
                failure_body(&e)
            }
        })
        .collect();
    json!({ "ok": all_ok, "responses": responses })
}

/// `slack_post_message`: post text to a channel.
pub struct PostMessageTool {
    clients: Arc<ClientManager>,
}

impl PostMessageTool {
    pub fn new(clients: Arc<ClientManager>) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl Tool for PostMessageTool {
    fn name(&self) -> &str {
        "slack_post_message"
    }

    fn description(&self) -> &str {
        "Send a text message to a Slack channel. Returns Slack's response, \
         including the message timestamp (`ts`)."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "channel": channel_property(),
                "text": {"type": "string", "description": "Message text"},
                "token": token_property()
            },
            "required": ["channel", "text"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let channel = require_str(&params, "channel")?;
        let text = require_str(&params, "text")?;
        optional_str(&params, "token")?;

        let result = async {
            let client = client_for(&self.clients, &params).await?;
            client.post_message(channel, text, None).await
        }
        .await;
        Ok(finish(result, start))
    }

    fn execution_timeout(&self) -> Duration {
        SLACK_TOOL_TIMEOUT
    }
}

/// `slack_read_thread_messages`: read replies in a thread.
pub struct ReadThreadMessagesTool {
    clients: Arc<ClientManager>,
}

impl ReadThreadMessagesTool {
    pub fn new(clients: Arc<ClientManager>) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl Tool for ReadThreadMessagesTool {
    fn name(&self) -> &str {
        "slack_read_thread_messages"
    }

    fn description(&self) -> &str {
        "Read the messages of a Slack thread, parent message first."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "channel": channel_property(),
                "thread_ts": {
                    "type": "string",
                    "description": "Timestamp of the thread's parent message"
                },
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Maximum number of messages (default 100)"
                },
                "token": token_property()
            },
            "required": ["channel", "thread_ts"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let channel = require_str(&params, "channel")?;
        let thread_ts = require_str(&params, "thread_ts")?;
        let limit = optional_u32(&params, "limit", DEFAULT_MESSAGE_LIMIT)?;
        optional_str(&params, "token")?;

        let result = async {
            let client = client_for(&self.clients, &params).await?;
            client.conversations_replies(channel, thread_ts, limit).await
        }
        .await;
        Ok(finish(result, start))
    }

    fn execution_timeout(&self) -> Duration {
        SLACK_TOOL_TIMEOUT
    }
}

/// `slack_read_channel_messages`: read channel history.
pub struct ReadChannelMessagesTool {
    clients: Arc<ClientManager>,
}

impl ReadChannelMessagesTool {
    pub fn new(clients: Arc<ClientManager>) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl Tool for ReadChannelMessagesTool {
    fn name(&self) -> &str {
        "slack_read_channel_messages"
    }

    fn description(&self) -> &str {
        "Read message history from a Slack channel, newest first, optionally \
         bounded by `oldest` / `latest` timestamps."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "channel": channel_property(),
                "limit": {
                    "type": "integer",
                    "minimum": 1,
                    "description": "Maximum number of messages (default 100)"
                },
                "oldest": {"type": "string", "description": "Start of the time range (Unix ts)"},
                "latest": {"type": "string", "description": "End of the time range (Unix ts)"},
                "inclusive": {
                    "type": "boolean",
                    "description": "Include messages exactly at oldest/latest (default false)"
                },
                "token": token_property()
            },
            "required": ["channel"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let channel = require_str(&params, "channel")?;
        let query = HistoryQuery {
            limit: Some(optional_u32(&params, "limit", DEFAULT_MESSAGE_LIMIT)?),
            oldest: optional_str(&params, "oldest")?.map(String::from),
            latest: optional_str(&params, "latest")?.map(String::from),
            inclusive: optional_bool(&params, "inclusive", false)?,
        };
        optional_str(&params, "token")?;

        let result = async {
            let client = client_for(&self.clients, &params).await?;
            client.conversations_history(channel, &query).await
        }
        .await;
        Ok(finish(result, start))
    }

    fn execution_timeout(&self) -> Duration {
        SLACK_TOOL_TIMEOUT
    }
}

/// `slack_thread_reply`: post one or more replies into a thread.
pub struct ThreadReplyTool {
    clients: Arc<ClientManager>,
}

impl ThreadReplyTool {
    pub fn new(clients: Arc<ClientManager>) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl Tool for ThreadReplyTool {
    fn name(&self) -> &str {
        "slack_thread_reply"
    }

    fn description(&self) -> &str {
        "Post one or more messages as replies in a Slack thread, in order. \
         Returns one Slack response per message."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "channel": channel_property(),
                "thread_ts": {
                    "type": "string",
                    "description": "Timestamp of the thread's parent message"
                },
                "texts": {
                    "type": "array",
                    "items": {"type": "string"},
                    "minItems": 1,
                    "description": "Messages to post, each as its own reply"
                },
                "token": token_property()
            },
            "required": ["channel", "thread_ts", "texts"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let channel = require_str(&params, "channel")?;
        let thread_ts = require_str(&params, "thread_ts")?;
        let texts = require_str_array(&params, "texts")?;
        optional_str(&params, "token")?;

        let client = match client_for(&self.clients, &params).await {
            Ok(client) => client,
            Err(e) => return Ok(finish(Err(e), start)),
        };

        let mut results = Vec::with_capacity(texts.len());
        for text in &texts {
            results.push(client.post_message(channel, text, Some(thread_ts)).await);
        }
        Ok(ToolOutput::success(batch_body(results), start.elapsed()))
    }

    fn execution_timeout(&self) -> Duration {
        SLACK_TOOL_TIMEOUT
    }
}

/// `slack_read_emojis`: list the workspace's emoji.
pub struct ReadEmojisTool {
    clients: Arc<ClientManager>,
}

impl ReadEmojisTool {
    pub fn new(clients: Arc<ClientManager>) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl Tool for ReadEmojisTool {
    fn name(&self) -> &str {
        "slack_read_emojis"
    }

    fn description(&self) -> &str {
        "List the emoji available in the Slack workspace, custom ones included, \
         as a map of name to image URL or alias."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "token": token_property()
            }
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        optional_str(&params, "token")?;

        let result = async {
            let client = client_for(&self.clients, &params).await?;
            client.emoji_list(true).await
        }
        .await;
        Ok(finish(result, start))
    }

    fn execution_timeout(&self) -> Duration {
        SLACK_TOOL_TIMEOUT
    }
}

/// `slack_add_reactions`: add emoji reactions to a message.
pub struct AddReactionsTool {
    clients: Arc<ClientManager>,
}

impl AddReactionsTool {
    pub fn new(clients: Arc<ClientManager>) -> Self {
        Self { clients }
    }
}

#[async_trait]
impl Tool for AddReactionsTool {
    fn name(&self) -> &str {
        "slack_add_reactions"
    }

    fn description(&self) -> &str {
        "Add one or more emoji reactions to a Slack message. \
         Returns one Slack response per emoji."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "channel": channel_property(),
                "timestamp": {
                    "type": "string",
                    "description": "Timestamp of the message to react to"
                },
                "emojis": {
                    "type": "array",
                    "items": {"type": "string"},
                    "minItems": 1,
                    "description": "Emoji names, with or without surrounding colons"
                },
                "token": token_property()
            },
            "required": ["channel", "timestamp", "emojis"]
        })
    }

    async fn execute(&self, params: Value) -> Result<ToolOutput, ToolError> {
        let start = Instant::now();
        let channel = require_str(&params, "channel")?;
        let timestamp = require_str(&params, "timestamp")?;
        let emojis = require_str_array(&params, "emojis")?;
        optional_str(&params, "token")?;

        let client = match client_for(&self.clients, &params).await {
            Ok(client) => client,
            Err(e) => return Ok(finish(Err(e), start)),
        };

        let mut results = Vec::with_capacity(emojis.len());
        for emoji in &emojis {
            let name = emoji.trim_matches(':');
            results.push(client.reactions_add(channel, timestamp, name).await);
        }
        Ok(ToolOutput::success(batch_body(results), start.elapsed()))
    }

    fn execution_timeout(&self) -> Duration {
        SLACK_TOOL_TIMEOUT
    }
}

/// Register every Slack tool against one shared client manager.
pub fn register_slack_tools(
    registry: &mut ToolRegistry,
    clients: Arc<ClientManager>,
) -> Result<(), ToolError> {
    registry.register(Arc::new(PostMessageTool::new(Arc::clone(&clients))))?;
    registry.register(Arc::new(ReadThreadMessagesTool::new(Arc::clone(&clients))))?;
    registry.register(Arc::new(ReadChannelMessagesTool::new(Arc::clone(&clients))))?;
    registry.register(Arc::new(ThreadReplyTool::new(Arc::clone(&clients))))?;
    registry.register(Arc::new(ReadEmojisTool::new(Arc::clone(&clients))))?;
    registry.register(Arc::new(AddReactionsTool::new(clients)))?;
    Ok(())
}
