use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Rolling in-process counters surfaced by the health endpoint.
///
/// Judgment failures are tracked separately from validation errors so the
/// two alarm independently: a spike in the former means the model
/// collaborator is degrading, the latter means a caller is misbehaving.
#[derive(Debug)]
pub struct Metrics {
    started_at: Instant,
    requests_processed: AtomicU64,
    total_latency_ms: AtomicU64,
    validation_errors: AtomicU64,
    judgment_failures: AtomicU64,
    audit_write_failures: AtomicU64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            requests_processed: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
            validation_errors: AtomicU64::new(0),
            judgment_failures: AtomicU64::new(0),
            audit_write_failures: AtomicU64::new(0),
        }
    }

    pub fn track_request(&self, latency_ms: u64) {
        self.requests_processed.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
    }

    pub fn track_validation_error(&self) {
        self.validation_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn track_judgment_failure(&self) {
        self.judgment_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn track_audit_write_failure(&self) {
        self.audit_write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn requests_processed(&self) -> u64 {
        self.requests_processed.load(Ordering::Relaxed)
    }

    pub fn average_response_time_ms(&self) -> u64 {
        let count = self.requests_processed();
        if count == 0 {
            return 0;
        }
        self.total_latency_ms.load(Ordering::Relaxed) / count
    }

    pub fn validation_errors(&self) -> u64 {
        self.validation_errors.load(Ordering::Relaxed)
    }

    pub fn judgment_failures(&self) -> u64 {
        self.judgment_failures.load(Ordering::Relaxed)
    }

    pub fn audit_write_failures(&self) -> u64 {
        self.audit_write_failures.load(Ordering::Relaxed)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_latency_over_tracked_requests() {
        let metrics = Metrics::new();
        assert_eq!(metrics.average_response_time_ms(), 0);

        metrics.track_request(100);
        metrics.track_request(300);
        assert_eq!(metrics.requests_processed(), 2);
        assert_eq!(metrics.average_response_time_ms(), 200);
    }

    #[test]
    fn failure_counters_are_independent() {
        let metrics = Metrics::new();
        metrics.track_judgment_failure();
        metrics.track_judgment_failure();
        metrics.track_validation_error();
        assert_eq!(metrics.judgment_failures(), 2);
        assert_eq!(metrics.validation_errors(), 1);
        assert_eq!(metrics.audit_write_failures(), 0);
    }
}
