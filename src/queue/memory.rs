use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{Mutex, RwLock, mpsc};

use crate::error::QueueError;
use crate::queue::{QueueBackend, QueueMessage};

const DEFAULT_CAPACITY: usize = 256;

/// In-process queue over a bounded tokio channel.
///
/// Publishing never waits: a full queue is reported as [`QueueError::Full`].
/// Messages live only in this process and are lost on restart.
pub struct MemoryBackend {
    tx: RwLock<Option<mpsc::Sender<QueueMessage>>>,
    rx: Mutex<mpsc::Receiver<QueueMessage>>,
    capacity: usize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx: RwLock::new(Some(tx)),
            rx: Mutex::new(rx),
            capacity,
        }
    }

    /// Stop accepting messages. Already queued messages can still be consumed.
    pub async fn close(&self) {
        if self.tx.write().await.take().is_some() {
            tracing::info!("Memory queue closed");
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueueBackend for MemoryBackend {
    fn name(&self) -> &str {
        "memory"
    }

    async fn publish(&self, topic: &str, payload: Value) -> Result<(), QueueError> {
        let closed = || QueueError::Closed {
            backend: "memory".to_string(),
        };
        let tx = self.tx.read().await.clone().ok_or_else(closed)?;
        tx.try_send(QueueMessage {
            topic: topic.to_string(),
            payload,
        })
        .map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => QueueError::Full {
                backend: "memory".to_string(),
                capacity: self.capacity,
            },
            mpsc::error::TrySendError::Closed(_) => closed(),
        })
    }

    async fn consume(&self) -> Option<QueueMessage> {
        self.rx.lock().await.recv().await
    }

    fn is_healthy(&self) -> bool {
        self.tx
            .try_read()
            .map(|tx| tx.as_ref().is_some_and(|tx| !tx.is_closed()))
            .unwrap_or(true)
    }
}
