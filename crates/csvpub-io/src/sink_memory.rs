use async_trait::async_trait;
use csvpub_core::{DeliveryReport, IngestError, Payload, Publisher};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Recorded {
    messages: Vec<(String, Payload)>,
    closes: usize,
}

/// Shared view of what a [`MemoryPublisher`] received
///
/// Stays usable after the publisher has been closed.
#[derive(Debug, Clone, Default)]
pub struct MemoryHandle {
    inner: Arc<Mutex<Recorded>>,
}

impl MemoryHandle {
    fn lock(&self) -> MutexGuard<'_, Recorded> {
        // a poisoned lock still holds consistent data
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// `(topic, payload)` pairs in send order
    pub fn messages(&self) -> Vec<(String, Payload)> {
        self.lock().messages.clone()
    }

    pub fn payloads(&self) -> Vec<String> {
        self.lock()
            .messages
            .iter()
            .map(|(_, p)| p.as_str().to_string())
            .collect()
    }

    /// Number of times the publisher was closed
    pub fn closes(&self) -> usize {
        self.lock().closes
    }
}

/// Publisher that keeps every payload in memory
pub struct MemoryPublisher {
    id: String,
    handle: MemoryHandle,
}

impl MemoryPublisher {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            handle: MemoryHandle::default(),
        }
    }

    pub fn handle(&self) -> MemoryHandle {
        self.handle.clone()
    }
}

#[async_trait]
impl Publisher for MemoryPublisher {
    fn name(&self) -> &str {
        &self.id
    }

    async fn send(&mut self, topic: &str, payload: &Payload) -> Result<(), IngestError> {
        self.handle
            .lock()
            .messages
            .push((topic.to_string(), payload.clone()));
        Ok(())
    }

    async fn close(self: Box<Self>) -> Result<DeliveryReport, IngestError> {
        let mut recorded = self.handle.lock();
        recorded.closes += 1;
        let count = recorded.messages.len() as u64;
        Ok(DeliveryReport {
            enqueued: count,
            delivered: count,
            failed: 0,
        })
    }
}
