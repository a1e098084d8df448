//! Route inbound events to their handler.
//!
//! Events without an inner `event.type`, and event types with no handler,
//! are logged and dropped: Slack still gets its 200 and nothing is retried.

use std::sync::Arc;

use crate::error::{EventError, SlackError};
use crate::slack::ClientManager;
use crate::webhook::event::{EventCallback, EventType, InboundEvent};
use crate::webhook::handlers::{HandlerContext, HandlerOutcome, handler_for};

/// A routable event: its type and the parsed inner payload.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutedEvent {
    pub event_type: EventType,
    pub callback: EventCallback,
}

/// Decide which handler, if any, should see `event`.
///
/// `Ok(None)` means the event is dropped. An inner event of a known type
/// that fails to parse is an error.
pub fn route(event: &InboundEvent) -> Result<Option<RoutedEvent>, EventError> {
    let Some(inner) = event.event.as_ref() else {
        tracing::warn!(
            event_id = event.event_id.as_deref().unwrap_or("-"),
            "Inbound payload has no 'event' object, ignoring"
        );
        return Ok(None);
    };
    let Some(type_name) = event.event_type() else {
        tracing::warn!(
            event_id = event.event_id.as_deref().unwrap_or("-"),
            "Inbound event has no 'type', ignoring"
        );
        return Ok(None);
    };
    let Ok(event_type) = type_name.parse::<EventType>() else {
        tracing::warn!(event_type = type_name, "No handler registered for event type");
        return Ok(None);
    };

    let callback = EventCallback::from_value(inner)?;
    Ok(Some(RoutedEvent {
        event_type,
        callback,
    }))
}

/// Run the handler for `event` with an already-resolved client.
pub async fn dispatch(
    event: &InboundEvent,
    ctx: &HandlerContext,
) -> Result<Option<HandlerOutcome>, EventError> {
    let Some(routed) = route(event)? else {
        return Ok(None);
    };
    run(&routed, ctx).await.map(Some)
}

async fn run(routed: &RoutedEvent, ctx: &HandlerContext) -> Result<HandlerOutcome, EventError> {
    tracing::debug!(event_type = %routed.event_type, "Dispatching event");
    let handler = handler_for(routed.event_type);
    handler(ctx, &routed.callback).await
}

/// Dispatcher that fetches a retrying client from the [`ClientManager`]
/// for each routable event.
pub struct EventDispatcher {
    clients: Arc<ClientManager>,
    bot_id: Option<String>,
}

impl EventDispatcher {
    pub fn new(clients: Arc<ClientManager>, bot_id: Option<String>) -> Self {
        Self { clients, bot_id }
    }

    pub async fn dispatch(
        &self,
        event: &InboundEvent,
    ) -> Result<Option<HandlerOutcome>, EventError> {
        let Some(routed) = route(event)? else {
            return Ok(None);
        };
        let client = self
            .clients
            .get_client(None, true)
            .await
            .map_err(SlackError::from)?;
        let ctx = HandlerContext {
            client,
            bot_id: self.bot_id.clone(),
        };
        run(&routed, &ctx).await.map(Some)
    }
}
