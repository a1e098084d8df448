use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;

use crate::error::EventError;
use crate::queue::{QueueBackend, QueueMessage};
use crate::webhook::{EventDispatcher, HandlerOutcome, InboundEvent};

/// Drains a [`QueueBackend`] and hands each event to the dispatcher.
///
/// A failing event is logged and skipped; it never stops the loop.
pub struct EventConsumer {
    backend: Arc<dyn QueueBackend>,
    dispatcher: Arc<EventDispatcher>,
    topic: String,
    shutdown_tx: watch::Sender<bool>,
}

impl EventConsumer {
    pub fn new(
        backend: Arc<dyn QueueBackend>,
        dispatcher: Arc<EventDispatcher>,
        topic: impl Into<String>,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            backend,
            dispatcher,
            topic: topic.into(),
            shutdown_tx,
        }
    }

    /// Consume until [`shutdown`](Self::shutdown) is called or the backend closes.
    pub async fn run(&self) {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        tracing::info!(
            backend = self.backend.name(),
            topic = %self.topic,
            "Starting Slack event consumer"
        );

        loop {
            if *shutdown_rx.borrow() {
                break;
            }
            let message = tokio::select! {
                biased;
                _ = shutdown_rx.changed() => break,
                message = self.backend.consume() => message,
            };
            let Some(message) = message else {
                tracing::info!("Queue backend closed");
                break;
            };
            self.handle_message(message).await;
        }

        tracing::info!("Slack event consumer stopped");
    }

    /// Ask [`run`](Self::run) to stop after the event in progress.
    pub fn shutdown(&self) {
        tracing::info!("Shutting down Slack event consumer");
        self.shutdown_tx.send_replace(true);
    }

    async fn handle_message(&self, message: QueueMessage) {
        if message.topic != self.topic {
            tracing::debug!(topic = %message.topic, "Skipping message for another topic");
            return;
        }
        match self.process_event(message.payload).await {
            Ok(Some(outcome)) => {
                tracing::debug!(result = %outcome.to_json(), "Event handled");
            }
            Ok(None) => {}
            Err(e) => tracing::error!("Error processing Slack event: {}", e),
        }
    }

    /// Decode and dispatch one queued payload.
    pub async fn process_event(&self, payload: Value) -> Result<Option<HandlerOutcome>, EventError> {
        let event: InboundEvent =
            serde_json::from_value(payload).map_err(|e| EventError::Malformed(e.to_string()))?;
        tracing::debug!(
            event_id = event.event_id.as_deref().unwrap_or("-"),
            event_type = event.event_type().unwrap_or("-"),
            "Processing event"
        );
        self.dispatcher.dispatch(&event).await
    }
}
