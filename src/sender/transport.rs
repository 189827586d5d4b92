use crate::domain::ShippingEnvelope;
use sha2::{Digest, Sha256};
use std::future::Future;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Queue rejected message: {code} - {message}")]
    Rejected { code: String, message: String },
    #[error("Queue temporarily unavailable: {0}")]
    Unavailable(String),
    #[error("Transport timeout")]
    Timeout,
    #[error("Network error: {0}")]
    Network(String),
    #[error("Payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: usize, limit: usize },
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
    #[error("Invalid transport configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Send task aborted: {0}")]
    Panicked(String),
}

impl TransportError {
    /// Whether sending the same envelope again may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Unavailable(_) | TransportError::Timeout | TransportError::Network(_)
        )
    }
}

/// A durable queue accepting one envelope per send.
///
/// On success the transport returns its opaque acknowledgement token
/// (the queue's message id).
pub trait QueueTransport: Send + Sync + 'static {
    fn send(
        &self,
        envelope: &ShippingEnvelope,
    ) -> impl Future<Output = Result<String, TransportError>> + Send;
}

/// Acknowledgement for one dispatched chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchAck {
    pub chunk_index: usize,
    pub message_id: String,
}

/// One chunk the queue did not accept.
#[derive(Error, Debug)]
#[error("chunk {chunk_index} ({content_hash}): {error}")]
pub struct TransportFailure {
    pub chunk_index: usize,
    pub content_hash: String,
    #[source]
    pub error: TransportError,
}

/// Short hex digest identifying a chunk's content in failure reports.
pub fn content_hash(message: &str) -> String {
    let digest = Sha256::digest(message.as_bytes());
    hex::encode(&digest[..8])
}
