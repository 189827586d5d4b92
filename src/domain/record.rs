use crate::sender::TransportError;
use serde::{Deserialize, Serialize};

/// Hard ceiling on one encoded envelope, shared by SQS and the HTTP queue.
pub const TRANSPORT_MAX_PAYLOAD_BYTES: usize = 262_144;

/// Space reserved for envelope metadata and JSON framing around a chunk.
pub const ENVELOPE_HEADROOM_BYTES: usize = 4_096;

/// One transport-ready log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub message: String,
    /// Epoch milliseconds captured when the record was encoded.
    pub timestamp: i64,
}

impl LogRecord {
    pub fn new(message: String) -> Self {
        Self {
            message,
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// The unit handed to the durable queue: exactly one record plus routing.
///
/// Field names on the wire follow the ingestion consumer's contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingEnvelope {
    #[serde(rename = "logEvents")]
    log_events: [LogRecord; 1],
    #[serde(rename = "logGroupName")]
    pub destination_group: String,
    #[serde(rename = "logStreamName")]
    pub stream_identity: String,
    #[serde(rename = "logLevel")]
    pub severity_label: String,
}

impl ShippingEnvelope {
    pub fn new(
        record: LogRecord,
        destination_group: impl Into<String>,
        stream_identity: impl Into<String>,
        severity_label: impl Into<String>,
    ) -> Self {
        Self {
            log_events: [record],
            destination_group: destination_group.into(),
            stream_identity: stream_identity.into(),
            severity_label: severity_label.into(),
        }
    }

    pub fn record(&self) -> &LogRecord {
        &self.log_events[0]
    }

    pub fn log_events(&self) -> &[LogRecord] {
        &self.log_events
    }

    /// Serializes the envelope into a queue message body.
    pub fn encode(&self) -> Result<String, TransportError> {
        let body = serde_json::to_string(self)?;
        if body.len() > TRANSPORT_MAX_PAYLOAD_BYTES {
            return Err(TransportError::PayloadTooLarge {
                size: body.len(),
                limit: TRANSPORT_MAX_PAYLOAD_BYTES,
            });
        }
        Ok(body)
    }
}
