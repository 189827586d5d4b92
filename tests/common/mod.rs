#![allow(dead_code)]

use parking_lot::Mutex;
use rask_log_shipper::sender::{QueueTransport, TransportError};
use rask_log_shipper::ShippingEnvelope;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// In-memory queue that records every envelope and fails chosen calls.
///
/// Like a real queue it encodes each envelope and refuses oversized bodies.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<ShippingEnvelope>>,
    calls: AtomicUsize,
    failing_calls: HashSet<usize>,
    transient: bool,
    delay: Option<Duration>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the given zero-based calls with a permanent rejection.
    pub fn failing_on(calls: impl IntoIterator<Item = usize>) -> Self {
        Self {
            failing_calls: calls.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Fails the given calls with a retryable error instead.
    pub fn transient(mut self) -> Self {
        self.transient = true;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn sent(&self) -> Vec<ShippingEnvelope> {
        self.sent.lock().clone()
    }
}

impl QueueTransport for RecordingTransport {
    async fn send(&self, envelope: &ShippingEnvelope) -> Result<String, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.sent.lock().push(envelope.clone());
        envelope.encode()?;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing_calls.contains(&call) {
            return Err(if self.transient {
                TransportError::Unavailable("throttled".to_string())
            } else {
                TransportError::Rejected {
                    code: "InvalidMessageContents".to_string(),
                    message: format!("call {call} rejected"),
                }
            });
        }
        Ok(format!("msg-{call}"))
    }
}
