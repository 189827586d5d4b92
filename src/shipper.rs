//! Public entry point of the shipping pipeline.

use crate::batch::{DEFAULT_MAX_CHUNK_BYTES, RawEvents, batch};
use crate::domain::{ShipError, encode_level};
use crate::identity::StreamIdentity;
use crate::sender::{
    DEFAULT_MAX_IN_FLIGHT, DispatchAck, DispatchSnapshot, Dispatcher, QueueTransport,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-call options for [`LogShipper::ship`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShipOptions {
    /// Severity ordinal 0-5; 0 drops the call.
    pub level: i64,
    /// Stream name used for this call instead of the process identity.
    pub stream_identity: Option<String>,
}

impl Default for ShipOptions {
    fn default() -> Self {
        Self {
            level: 2,
            stream_identity: None,
        }
    }
}

impl ShipOptions {
    pub fn level(level: i64) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    pub fn with_stream_identity(mut self, stream_identity: impl Into<String>) -> Self {
        self.stream_identity = Some(stream_identity.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShipperSettings {
    pub max_chunk_bytes: usize,
    pub max_in_flight: usize,
}

impl Default for ShipperSettings {
    fn default() -> Self {
        Self {
            max_chunk_bytes: DEFAULT_MAX_CHUNK_BYTES,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

/// Normalizes, chunks and dispatches log events to the durable queue.
pub struct LogShipper<T> {
    dispatcher: Dispatcher<T>,
    identity: Arc<StreamIdentity>,
    max_chunk_bytes: usize,
}

impl<T: QueueTransport> LogShipper<T> {
    pub fn new(transport: Arc<T>, identity: Arc<StreamIdentity>, settings: ShipperSettings) -> Self {
        Self {
            dispatcher: Dispatcher::new(transport, settings.max_in_flight),
            identity,
            max_chunk_bytes: settings.max_chunk_bytes,
        }
    }

    /// Default settings and an identity built from the process environment.
    pub fn with_transport(transport: T) -> Self {
        Self::new(
            Arc::new(transport),
            Arc::new(StreamIdentity::new()),
            ShipperSettings::default(),
        )
    }

    pub fn identity(&self) -> &Arc<StreamIdentity> {
        &self.identity
    }

    pub fn transport(&self) -> &Arc<T> {
        self.dispatcher.transport()
    }

    pub fn metrics(&self) -> DispatchSnapshot {
        self.dispatcher.metrics().snapshot()
    }

    /// Ships `events` to `destination_group`.
    ///
    /// A suppressed level returns an empty list before anything else is
    /// checked. Otherwise the destination and the events are validated
    /// before any send. Every chunk is attempted; if any of them fails the
    /// call fails with [`ShipError::AggregateDispatch`] even though the
    /// other chunks may already be on the queue.
    pub async fn ship(
        &self,
        events: impl Into<RawEvents>,
        destination_group: &str,
        options: ShipOptions,
    ) -> Result<Vec<DispatchAck>, ShipError> {
        let encoding = encode_level(options.level);
        if encoding.suppressed {
            debug!("Dropping log call at suppressed level {}", options.level);
            return Ok(Vec::new());
        }

        if destination_group.trim().is_empty() {
            return Err(ShipError::MissingDestination);
        }

        let records = batch(events, encoding.label, self.max_chunk_bytes)?;
        let stream_identity = self
            .identity
            .resolve_with(options.stream_identity.as_deref())
            .await?;

        let report = self
            .dispatcher
            .dispatch_all(records, destination_group, &stream_identity, encoding.label)
            .await;

        let attempted = report.attempted();
        if !report.is_success() {
            warn!(
                "{} of {} chunks to {} failed",
                report.failures.len(),
                attempted,
                destination_group
            );
            return Err(ShipError::AggregateDispatch {
                attempted,
                failures: report.failures,
            });
        }

        info!(
            "Shipped {} chunks to {} on stream {}",
            attempted, destination_group, stream_identity
        );
        Ok(report.acknowledgements)
    }
}
