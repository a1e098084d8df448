//! Events API payload types.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::EventError;

/// Outer Events API envelope as delivered to the webhook.
///
/// Only the fields routing needs are typed; everything else is kept in
/// `extra` so the payload survives the queue round trip unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboundEvent {
    /// `url_verification`, `event_callback`, ...
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Present only on the URL verification handshake.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub challenge: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_time: Option<i64>,
    /// The inner event. Left untyped until routing picks a handler.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl InboundEvent {
    /// `event.type`, if the inner event exists and carries one.
    pub fn event_type(&self) -> Option<&str> {
        self.event.as_ref()?.get("type")?.as_str()
    }
}

/// The inner `event` object for the event types this crate handles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventCallback {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub thread_ts: Option<String>,
    #[serde(default)]
    pub event_ts: Option<String>,
    /// Emoji name for `reaction_added`.
    #[serde(default)]
    pub reaction: Option<String>,
    /// Reacted-to item for `reaction_added`.
    #[serde(default)]
    pub item: Option<ReactionItem>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReactionItem {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub ts: Option<String>,
}

impl EventCallback {
    pub fn from_value(value: &Value) -> Result<Self, EventError> {
        Self::deserialize(value).map_err(|e| EventError::Malformed(e.to_string()))
    }
}

/// Event types with a registered handler.
///
/// Adding a variant forces a matching arm in
/// [`crate::webhook::handlers::handler_for`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    AppMention,
    ReactionAdded,
}

impl EventType {
    pub const ALL: [EventType; 2] = [EventType::AppMention, EventType::ReactionAdded];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AppMention => "app_mention",
            Self::ReactionAdded => "reaction_added",
        }
    }
}

impl FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("no handler for event type '{s}'"))
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
