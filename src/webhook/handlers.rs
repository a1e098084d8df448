//! Built-in Events API handlers.

use std::sync::{Arc, LazyLock};

use futures::future::BoxFuture;
use regex::Regex;
use serde_json::{Value, json};

use crate::error::EventError;
use crate::slack::{HistoryQuery, SlackClient};
use crate::webhook::event::{EventCallback, EventType};

pub const GREETING: &str = "Hello! I'm your Slack bot. How can I help you today?";

static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<@[A-Z0-9]+>").expect("mention pattern is valid"));

/// What a handler has to work with.
#[derive(Clone)]
pub struct HandlerContext {
    pub client: Arc<SlackClient>,
    /// The bot's own ID (`SLACK_BOT_ID`), used to recognise its messages.
    pub bot_id: Option<String>,
}

/// Result of running a handler.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutcome {
    /// A reply was posted; holds Slack's response.
    Replied(Value),
    /// The reacted-to message could not be fetched.
    MessageNotFound,
    /// The reacted-to message was not the bot's, so nothing was posted.
    NotBotMessage {
        /// With no bot ID configured the check is weaker and reported as a failure.
        bot_id_configured: bool,
    },
}

impl HandlerOutcome {
    pub fn to_json(&self) -> Value {
        match self {
            Self::Replied(response) => response.clone(),
            Self::MessageNotFound => json!({"ok": false, "error": "Message not found"}),
            Self::NotBotMessage {
                bot_id_configured: true,
            } => json!({"ok": true, "message": "Not a bot message"}),
            Self::NotBotMessage {
                bot_id_configured: false,
            } => json!({"ok": false, "error": "Not a bot message"}),
        }
    }
}

/// Shared handler signature.
pub type EventHandlerFn =
    for<'a> fn(&'a HandlerContext, &'a EventCallback) -> BoxFuture<'a, Result<HandlerOutcome, EventError>>;

/// The handler for each event type.
pub fn handler_for(event_type: EventType) -> EventHandlerFn {
    match event_type {
        EventType::AppMention => app_mention,
        EventType::ReactionAdded => reaction_added,
    }
}

fn app_mention<'a>(
    ctx: &'a HandlerContext,
    event: &'a EventCallback,
) -> BoxFuture<'a, Result<HandlerOutcome, EventError>> {
    Box::pin(handle_app_mention(ctx, event))
}

fn reaction_added<'a>(
    ctx: &'a HandlerContext,
    event: &'a EventCallback,
) -> BoxFuture<'a, Result<HandlerOutcome, EventError>> {
    Box::pin(handle_reaction_added(ctx, event))
}

/// Text with every `<@USER>` mention removed and whitespace trimmed.
pub fn strip_mentions(text: &str) -> String {
    MENTION_RE.replace_all(text, "").trim().to_string()
}

/// Reply text for a mention.
pub fn mention_reply(text: &str) -> String {
    let clean = strip_mentions(text);
    if clean.is_empty() {
        GREETING.to_string()
    } else {
        format!("You said: {clean}")
    }
}

/// Echo the mention back in the same thread.
pub async fn handle_app_mention(
    ctx: &HandlerContext,
    event: &EventCallback,
) -> Result<HandlerOutcome, EventError> {
    let channel = event
        .channel
        .as_deref()
        .ok_or(EventError::MissingField("channel"))?;
    let text = event.text.as_deref().ok_or(EventError::MissingField("text"))?;
    let thread_ts = event
        .thread_ts
        .as_deref()
        .or(event.ts.as_deref())
        .ok_or(EventError::MissingField("ts"))?;

    let reply = mention_reply(text);
    tracing::info!(channel, thread_ts, "Responding to mention");

    let response = ctx
        .client
        .post_message(channel, &reply, Some(thread_ts))
        .await?;
    Ok(HandlerOutcome::Replied(response))
}

/// Thank users for reacting to one of the bot's messages.
pub async fn handle_reaction_added(
    ctx: &HandlerContext,
    event: &EventCallback,
) -> Result<HandlerOutcome, EventError> {
    let item = event.item.as_ref().ok_or(EventError::MissingField("item"))?;
    let channel = item
        .channel
        .as_deref()
        .ok_or(EventError::MissingField("item.channel"))?;
    let ts = item.ts.as_deref().ok_or(EventError::MissingField("item.ts"))?;
    let reaction = event
        .reaction
        .as_deref()
        .ok_or(EventError::MissingField("reaction"))?;

    let query = HistoryQuery {
        limit: Some(1),
        latest: Some(ts.to_string()),
        inclusive: true,
        ..Default::default()
    };
    let history = ctx.client.conversations_history(channel, &query).await?;

    let Some(message) = history
        .get("messages")
        .and_then(Value::as_array)
        .and_then(|m| m.first())
    else {
        tracing::warn!(channel, ts, "Could not find reacted-to message");
        return Ok(HandlerOutcome::MessageNotFound);
    };

    let authored_by_bot = match ctx.bot_id.as_deref() {
        Some(bot_id) => {
            message_field(message, "bot_id") == Some(bot_id)
                || message_field(message, "app_id") == Some(bot_id)
        }
        None => {
            tracing::warn!("SLACK_BOT_ID not set, falling back to message bot/app id");
            message_field(message, "bot_id").is_some() || message_field(message, "app_id").is_some()
        }
    };

    if !authored_by_bot {
        return Ok(HandlerOutcome::NotBotMessage {
            bot_id_configured: ctx.bot_id.is_some(),
        });
    }

    tracing::info!(
        channel,
        reaction,
        user = event.user.as_deref().unwrap_or("unknown"),
        "Reaction added to bot message"
    );
    let text = format!("Thanks for reacting with :{reaction}: to my message!");
    let response = ctx.client.post_message(channel, &text, Some(ts)).await?;
    Ok(HandlerOutcome::Replied(response))
}

fn message_field<'a>(message: &'a Value, key: &str) -> Option<&'a str> {
    message
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::error::SlackError;
    use crate::testing::RecordingApi;
    use crate::webhook::event::ReactionItem;

    fn ctx(api: Arc<RecordingApi>, bot_id: Option<&str>) -> HandlerContext {
        HandlerContext {
            client: Arc::new(SlackClient::plain(api, "...test")),
            bot_id: bot_id.map(String::from),
        }
    }

    fn mention(text: &str, ts: &str, thread_ts: Option<&str>) -> EventCallback {
        EventCallback {
            kind: "app_mention".to_string(),
            channel: Some("C1".to_string()),
            text: Some(text.to_string()),
            ts: Some(ts.to_string()),
            thread_ts: thread_ts.map(String::from),
            ..Default::default()
        }
    }

    fn reaction(reaction: &str) -> EventCallback {
        EventCallback {
            kind: "reaction_added".to_string(),
            user: Some("U9".to_string()),
            reaction: Some(reaction.to_string()),
            item: Some(ReactionItem {
                kind: Some("message".to_string()),
                channel: Some("C1".to_string()),
                ts: Some("100.1".to_string()),
            }),
            ..Default::default()
        }
    }

    fn history(messages: Value) -> Result<Value, SlackError> {
        Ok(json!({"ok": true, "messages": messages}))
    }

    #[test]
    fn test_strip_mentions() {
        assert_eq!(strip_mentions("<@U123ABC> hello"), "hello");
        assert_eq!(strip_mentions("hey <@U1> and <@U2>  "), "hey  and");
        assert_eq!(strip_mentions("<@lowercase> kept"), "<@lowercase> kept");
    }

    #[test]
    fn test_mention_reply() {
        assert_eq!(mention_reply("<@BOTID> hello"), "You said: hello");
        assert_eq!(mention_reply("<@BOTID>   "), GREETING);
    }

    #[test]
    fn test_handler_for_covers_all_types() {
        for t in EventType::ALL {
            let _ = handler_for(t);
        }
    }

    #[tokio::test]
    async fn test_app_mention_replies_in_message_thread() {
        let api = Arc::new(RecordingApi::ok(json!({"ok": true, "ts": "2.2"})));
        let ctx = ctx(api.clone(), None);

        let outcome = handle_app_mention(&ctx, &mention("<@BOTID> hello", "1.1", None))
            .await
            .unwrap();

        assert!(matches!(outcome, HandlerOutcome::Replied(_)));
        assert_eq!(
            api.calls_to("chat.postMessage"),
            vec![json!({"channel": "C1", "text": "You said: hello", "thread_ts": "1.1"})]
        );
    }

    #[tokio::test]
    async fn test_app_mention_keeps_existing_thread() {
        let api = Arc::new(RecordingApi::ok(json!({"ok": true})));
        let ctx = ctx(api.clone(), None);

        handle_app_mention(&ctx, &mention("<@BOTID>", "1.5", Some("1.0")))
            .await
            .unwrap();

        let call = &api.calls_to("chat.postMessage")[0];
        assert_eq!(call["thread_ts"], "1.0");
        assert_eq!(call["text"], GREETING);
    }

    #[tokio::test]
    async fn test_app_mention_missing_channel() {
        let api = Arc::new(RecordingApi::ok(json!({"ok": true})));
        let mut event = mention("hi", "1.1", None);
        event.channel = None;

        let err = handle_app_mention(&ctx(api.clone(), None), &event)
            .await
            .unwrap_err();
        assert!(matches!(err, EventError::MissingField("channel")));
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_reaction_message_not_found() {
        let api = Arc::new(
            RecordingApi::ok(json!({"ok": true}))
                .respond("conversations.history", history(json!([]))),
        );
        let outcome = handle_reaction_added(&ctx(api.clone(), Some("B1")), &reaction("tada"))
            .await
            .unwrap();

        assert_eq!(outcome, HandlerOutcome::MessageNotFound);
        assert_eq!(
            outcome.to_json(),
            json!({"ok": false, "error": "Message not found"})
        );
        assert!(api.calls_to("chat.postMessage").is_empty());
        assert_eq!(
            api.calls_to("conversations.history"),
            vec![json!({"channel": "C1", "latest": "100.1", "inclusive": true, "limit": 1})]
        );
    }

    #[tokio::test]
    async fn test_reaction_on_own_message_with_bot_id() {
        let api = Arc::new(
            RecordingApi::ok(json!({"ok": true}))
                .respond("conversations.history", history(json!([{"bot_id": "B1", "ts": "100.1"}]))),
        );
        let outcome = handle_reaction_added(&ctx(api.clone(), Some("B1")), &reaction("tada"))
            .await
            .unwrap();

        assert!(matches!(outcome, HandlerOutcome::Replied(_)));
        assert_eq!(
            api.calls_to("chat.postMessage"),
            vec![json!({
                "channel": "C1",
                "text": "Thanks for reacting with :tada: to my message!",
                "thread_ts": "100.1"
            })]
        );
    }

    #[tokio::test]
    async fn test_reaction_matches_app_id() {
        let api = Arc::new(
            RecordingApi::ok(json!({"ok": true}))
                .respond("conversations.history", history(json!([{"app_id": "A1"}]))),
        );
        let outcome = handle_reaction_added(&ctx(api, Some("A1")), &reaction("+1"))
            .await
            .unwrap();
        assert!(matches!(outcome, HandlerOutcome::Replied(_)));
    }

    #[tokio::test]
    async fn test_reaction_on_other_bot_with_bot_id() {
        let api = Arc::new(
            RecordingApi::ok(json!({"ok": true}))
                .respond("conversations.history", history(json!([{"bot_id": "B2"}]))),
        );
        let outcome = handle_reaction_added(&ctx(api.clone(), Some("B1")), &reaction("tada"))
            .await
            .unwrap();

        assert_eq!(
            outcome.to_json(),
            json!({"ok": true, "message": "Not a bot message"})
        );
        assert_eq!(api.call_count(), 1);
    }

    #[tokio::test]
    async fn test_reaction_without_bot_id_uses_message_identity() {
        let api = Arc::new(
            RecordingApi::ok(json!({"ok": true}))
                .respond("conversations.history", history(json!([{"bot_id": "B7"}]))),
        );
        let outcome = handle_reaction_added(&ctx(api, None), &reaction("eyes"))
            .await
            .unwrap();
        assert!(matches!(outcome, HandlerOutcome::Replied(_)));
    }

    #[tokio::test]
    async fn test_reaction_on_human_message_without_bot_id() {
        let api = Arc::new(
            RecordingApi::ok(json!({"ok": true}))
                .respond("conversations.history", history(json!([{"user": "U1", "text": "hi"}]))),
        );
        let outcome = handle_reaction_added(&ctx(api.clone(), None), &reaction("eyes"))
            .await
            .unwrap();

        assert_eq!(
            outcome.to_json(),
            json!({"ok": false, "error": "Not a bot message"})
        );
        assert_eq!(api.call_count(), 1);
    }

    #[tokio::test]
    async fn test_reaction_history_error_propagates() {
        let api = Arc::new(RecordingApi::failing(SlackError::Api {
            method: "conversations.history".to_string(),
            error: "not_in_channel".to_string(),
        }));
        let err = handle_reaction_added(&ctx(api, None), &reaction("eyes"))
            .await
            .unwrap_err();
        assert!(matches!(err, EventError::Slack(SlackError::Api { .. })));
    }
}
