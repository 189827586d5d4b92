use super::metrics::DispatchMetrics;
use super::transport::{DispatchAck, QueueTransport, TransportError, TransportFailure, content_hash};
use crate::domain::{LogRecord, ShippingEnvelope};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

pub const DEFAULT_MAX_IN_FLIGHT: usize = 16;

/// Outcome of dispatching every record of one ship call.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub acknowledgements: Vec<DispatchAck>,
    pub failures: Vec<TransportFailure>,
}

impl DispatchReport {
    pub fn attempted(&self) -> usize {
        self.acknowledgements.len() + self.failures.len()
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Sends each record as its own envelope, concurrently.
///
/// A failed send never stops the others; every record is attempted and the
/// report lists acknowledgements and failures in record order. Delivery order
/// at the queue across chunks is not guaranteed.
pub struct Dispatcher<T> {
    transport: Arc<T>,
    limiter: Arc<Semaphore>,
    metrics: DispatchMetrics,
}

impl<T: QueueTransport> Dispatcher<T> {
    pub fn new(transport: Arc<T>, max_in_flight: usize) -> Self {
        Self {
            transport,
            limiter: Arc::new(Semaphore::new(max_in_flight.max(1))),
            metrics: DispatchMetrics::new(),
        }
    }

    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    pub fn metrics(&self) -> &DispatchMetrics {
        &self.metrics
    }

    pub async fn dispatch_all(
        &self,
        records: Vec<LogRecord>,
        destination_group: &str,
        stream_identity: &str,
        severity_label: &str,
    ) -> DispatchReport {
        let total = records.len();
        let mut hashes = Vec::with_capacity(total);
        let mut sizes = Vec::with_capacity(total);
        let mut task_chunks = HashMap::with_capacity(total);
        let mut join_set = JoinSet::new();

        for (chunk_index, record) in records.into_iter().enumerate() {
            hashes.push(content_hash(&record.message));
            sizes.push(record.message.len());
            let envelope =
                ShippingEnvelope::new(record, destination_group, stream_identity, severity_label);
            let transport = Arc::clone(&self.transport);
            let limiter = Arc::clone(&self.limiter);
            let metrics = self.metrics.clone();

            let handle = join_set.spawn(async move {
                let outcome = send_one(transport.as_ref(), &limiter, &metrics, &envelope).await;
                (chunk_index, outcome)
            });
            task_chunks.insert(handle.id(), chunk_index);
        }

        let mut outcomes: Vec<Option<Result<String, TransportError>>> =
            std::iter::repeat_with(|| None).take(total).collect();

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((chunk_index, outcome)) => outcomes[chunk_index] = Some(outcome),
                Err(e) => {
                    if let Some(&chunk_index) = task_chunks.get(&e.id()) {
                        // The send never returned, so it was not counted.
                        self.metrics
                            .record_send(false, sizes[chunk_index], Duration::ZERO);
                        outcomes[chunk_index] = Some(Err(TransportError::Panicked(e.to_string())));
                    }
                }
            }
        }

        let mut report = DispatchReport::default();
        for (chunk_index, (outcome, content_hash)) in outcomes.into_iter().zip(hashes).enumerate() {
            let outcome = outcome.unwrap_or_else(|| {
                Err(TransportError::Panicked("task did not complete".to_string()))
            });

            match outcome {
                Ok(message_id) => report.acknowledgements.push(DispatchAck {
                    chunk_index,
                    message_id,
                }),
                Err(error) => {
                    warn!(
                        "Failed to dispatch chunk {} ({}) to {}: {}",
                        chunk_index, content_hash, destination_group, error
                    );
                    report.failures.push(TransportFailure {
                        chunk_index,
                        content_hash,
                        error,
                    });
                }
            }
        }

        report
    }
}

async fn send_one<T: QueueTransport>(
    transport: &T,
    limiter: &Semaphore,
    metrics: &DispatchMetrics,
    envelope: &ShippingEnvelope,
) -> Result<String, TransportError> {
    let _permit = limiter
        .acquire()
        .await
        .map_err(|_| TransportError::Unavailable("dispatcher is shut down".to_string()))?;

    let bytes = envelope.record().message.len();
    let start = Instant::now();
    let result = transport.send(envelope).await;
    let latency = start.elapsed();
    metrics.record_send(result.is_ok(), bytes, latency);

    if let Ok(message_id) = &result {
        debug!(
            "Dispatched {} bytes to {} as {} in {:?}",
            bytes, envelope.destination_group, message_id, latency
        );
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedTransport {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        peak_in_flight: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
            }
        }
    }

    impl QueueTransport for ScriptedTransport {
        async fn send(&self, envelope: &ShippingEnvelope) -> Result<String, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            let message = &envelope.record().message;
            if message.contains("slow") {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
            if message.contains("panic") {
                panic!("transport blew up on {message}");
            }
            if message.contains("fail") {
                return Err(TransportError::Rejected {
                    code: "InvalidMessageContents".into(),
                    message: message.clone(),
                });
            }
            Ok(format!("id-{message}"))
        }
    }

    fn records(messages: &[&str]) -> Vec<LogRecord> {
        messages.iter().map(|m| LogRecord::new((*m).to_string())).collect()
    }

    #[tokio::test]
    async fn test_failures_do_not_stop_other_sends() {
        let transport = Arc::new(ScriptedTransport::new());
        let dispatcher = Dispatcher::new(Arc::clone(&transport), 4);

        let report = dispatcher
            .dispatch_all(records(&["a", "fail", "c"]), "grp", "stream", "INFO")
            .await;

        assert_eq!(transport.calls.load(Ordering::SeqCst), 3);
        assert_eq!(report.attempted(), 3);
        let indices: Vec<_> = report.acknowledgements.iter().map(|a| a.chunk_index).collect();
        assert_eq!(indices, vec![0, 2]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].chunk_index, 1);
        assert_eq!(report.failures[0].content_hash, content_hash("fail"));
    }

    #[tokio::test]
    async fn test_in_flight_sends_are_bounded() {
        let transport = Arc::new(ScriptedTransport::new());
        let dispatcher = Dispatcher::new(Arc::clone(&transport), 2);
        let messages: Vec<String> = (0..10).map(|i| format!("m{i}")).collect();
        let refs: Vec<&str> = messages.iter().map(String::as_str).collect();

        let report = dispatcher.dispatch_all(records(&refs), "grp", "s", "INFO").await;

        assert!(report.is_success());
        assert!(transport.peak_in_flight.load(Ordering::SeqCst) <= 2);
        let ids: Vec<_> = report.acknowledgements.iter().map(|a| a.message_id.clone()).collect();
        let expected: Vec<_> = messages.iter().map(|m| format!("id-{m}")).collect();
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_panicking_send_is_reported_as_failure() {
        let transport = Arc::new(ScriptedTransport::new());
        let dispatcher = Dispatcher::new(transport, 4);

        let report = dispatcher
            .dispatch_all(records(&["ok", "panic"]), "grp", "s", "INFO")
            .await;

        assert_eq!(report.acknowledgements.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].chunk_index, 1);
        assert!(matches!(report.failures[0].error, TransportError::Panicked(_)));

        let snapshot = dispatcher.metrics().snapshot();
        assert_eq!(snapshot.attempted_sends as usize, report.attempted());
        assert_eq!(snapshot.failed_sends, 1);
    }

    #[tokio::test]
    async fn test_panics_stay_with_their_own_chunk() {
        let dispatcher = Dispatcher::new(Arc::new(ScriptedTransport::new()), 4);

        // The first chunk panics last.
        let report = dispatcher
            .dispatch_all(records(&["panic-slow-first", "panic-second"]), "grp", "s", "INFO")
            .await;

        assert!(report.acknowledgements.is_empty());
        assert_eq!(report.failures.len(), 2);
        for (failure, message) in report.failures.iter().zip(["panic-slow-first", "panic-second"]) {
            assert_eq!(failure.content_hash, content_hash(message));
            match &failure.error {
                TransportError::Panicked(reason) => {
                    assert!(reason.contains(message), "{reason} does not mention {message}");
                }
                other => panic!("expected Panicked, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_metrics_track_every_send() {
        let dispatcher = Dispatcher::new(Arc::new(ScriptedTransport::new()), 4);
        dispatcher
            .dispatch_all(records(&["a", "fail"]), "grp", "s", "INFO")
            .await;

        let snapshot = dispatcher.metrics().snapshot();
        assert_eq!(snapshot.attempted_sends, 2);
        assert_eq!(snapshot.successful_sends, 1);
        assert_eq!(snapshot.failed_sends, 1);
    }
}
