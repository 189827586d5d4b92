use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

const MAX_LATENCY_SAMPLES: usize = 1000;

/// Percentile of already sorted samples; empty input yields zero.
fn calculate_percentile(sorted_samples: &[Duration], percentile: f64) -> Duration {
    let Some(&last) = sorted_samples.last() else {
        return Duration::ZERO;
    };

    let percentile = percentile.clamp(0.0, 1.0);
    let index_f64 = percentile * (sorted_samples.len() - 1) as f64;
    if !index_f64.is_finite() {
        return sorted_samples[0];
    }

    sorted_samples
        .get(index_f64.floor() as usize)
        .copied()
        .unwrap_or(last)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchSnapshot {
    pub attempted_sends: u64,
    pub successful_sends: u64,
    pub failed_sends: u64,
    pub bytes_sent: u64,
    pub average_latency: Duration,
    pub p95_latency: Duration,
    pub p99_latency: Duration,
}

/// Counters shared by every send a dispatcher performs.
#[derive(Clone, Default)]
pub struct DispatchMetrics {
    attempted: Arc<AtomicU64>,
    successful: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
    bytes_sent: Arc<AtomicU64>,
    total_latency_ms: Arc<AtomicU64>,
    latency_samples: Arc<Mutex<Vec<Duration>>>,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_send(&self, success: bool, bytes: usize, latency: Duration) {
        self.attempted.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms
            .fetch_add(latency.as_millis() as u64, Ordering::Relaxed);

        if success {
            self.successful.fetch_add(1, Ordering::Relaxed);
            self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }

        let mut samples = self.latency_samples.lock();
        samples.push(latency);
        if samples.len() > MAX_LATENCY_SAMPLES {
            samples.remove(0);
        }
    }

    pub fn snapshot(&self) -> DispatchSnapshot {
        let attempted_sends = self.attempted.load(Ordering::Relaxed);
        let total_latency_ms = self.total_latency_ms.load(Ordering::Relaxed);

        let average_latency = if attempted_sends > 0 {
            Duration::from_millis(total_latency_ms / attempted_sends)
        } else {
            Duration::ZERO
        };

        let mut sorted = self.latency_samples.lock().clone();
        sorted.sort_unstable();

        DispatchSnapshot {
            attempted_sends,
            successful_sends: self.successful.load(Ordering::Relaxed),
            failed_sends: self.failed.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            average_latency,
            p95_latency: calculate_percentile(&sorted, 0.95),
            p99_latency: calculate_percentile(&sorted, 0.99),
        }
    }

    pub fn reset(&self) {
        self.attempted.store(0, Ordering::Relaxed);
        self.successful.store(0, Ordering::Relaxed);
        self.failed.store(0, Ordering::Relaxed);
        self.bytes_sent.store(0, Ordering::Relaxed);
        self.total_latency_ms.store(0, Ordering::Relaxed);
        self.latency_samples.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_edges() {
        assert_eq!(calculate_percentile(&[], 0.95), Duration::ZERO);
        let one = [Duration::from_millis(7)];
        assert_eq!(calculate_percentile(&one, 0.99), Duration::from_millis(7));
    }

    #[test]
    fn test_record_and_snapshot() {
        let metrics = DispatchMetrics::new();
        metrics.record_send(true, 100, Duration::from_millis(10));
        metrics.record_send(false, 50, Duration::from_millis(30));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.attempted_sends, 2);
        assert_eq!(snapshot.successful_sends, 1);
        assert_eq!(snapshot.failed_sends, 1);
        assert_eq!(snapshot.bytes_sent, 100);
        assert_eq!(snapshot.average_latency, Duration::from_millis(20));

        metrics.reset();
        assert_eq!(metrics.snapshot(), DispatchSnapshot::default());
    }

    #[test]
    fn test_samples_are_capped() {
        let metrics = DispatchMetrics::new();
        for i in 0..(MAX_LATENCY_SAMPLES + 10) {
            metrics.record_send(true, 1, Duration::from_millis(i as u64));
        }
        assert_eq!(metrics.latency_samples.lock().len(), MAX_LATENCY_SAMPLES);
    }
}
