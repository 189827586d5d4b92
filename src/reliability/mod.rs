pub mod retry;

pub use retry::{RetryError, RetryPolicy, RetryStrategy};

use crate::domain::ShippingEnvelope;
use crate::sender::{QueueTransport, TransportError};

/// Applies a [`RetryPolicy`] to every send of the wrapped transport.
///
/// Only errors the transport marks retryable are repeated. Chunking and
/// dispatch know nothing about this layer.
pub struct RetryingTransport<T> {
    inner: T,
    policy: RetryPolicy,
}

impl<T: QueueTransport> RetryingTransport<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &T {
        &self.inner
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl<T: QueueTransport> QueueTransport for RetryingTransport<T> {
    async fn send(&self, envelope: &ShippingEnvelope) -> Result<String, TransportError> {
        self.policy
            .run(|_| self.inner.send(envelope), TransportError::is_retryable)
            .await
    }
}
