//! Event queue between the webhook and the handlers.
//!
//! The webhook only verifies and enqueues; an [`EventConsumer`] drains the
//! queue in the background and runs the dispatcher, so Slack gets its 200
//! well inside the three second deadline regardless of handler latency.

mod consumer;
mod memory;

use async_trait::async_trait;
use serde_json::Value;

pub use consumer::EventConsumer;
pub use memory::MemoryBackend;

use crate::error::QueueError;

/// One queued message.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueMessage {
    pub topic: String,
    pub payload: Value,
}

/// A message queue the webhook publishes to and the consumer reads from.
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// Backend name for logs and the health endpoint.
    fn name(&self) -> &str;

    /// Enqueue `payload` under `topic`.
    async fn publish(&self, topic: &str, payload: Value) -> Result<(), QueueError>;

    /// Wait for the next message. `None` once the backend is closed and drained.
    async fn consume(&self) -> Option<QueueMessage>;

    /// Whether the backend still accepts messages.
    fn is_healthy(&self) -> bool;
}
