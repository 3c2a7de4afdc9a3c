/// Request statistics for API clients
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free counters, one tracker per client
#[derive(Debug, Default)]
pub struct ApiStatsTracker {
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
    total_response_time_ms: AtomicU64,
    last_error: Mutex<Option<String>>,
}

impl ApiStatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self, success: bool, elapsed_ms: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_response_time_ms
            .fetch_add(elapsed_ms, Ordering::Relaxed);
        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_error(&self, message: &str) {
        *self.last_error.lock() = Some(message.to_string());
    }

    pub fn get_stats(&self) -> ApiStats {
        let total = self.total_requests.load(Ordering::Relaxed);
        let total_time = self.total_response_time_ms.load(Ordering::Relaxed);

        ApiStats {
            total_requests: total,
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            average_response_time_ms: if total > 0 {
                total_time as f64 / total as f64
            } else {
                0.0
            },
            last_error: self.last_error.lock().clone(),
        }
    }
}

/// Serializable snapshot of [`ApiStatsTracker`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub average_response_time_ms: f64,
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_accumulate() {
        let tracker = ApiStatsTracker::new();
        tracker.record_request(true, 100);
        tracker.record_request(false, 300);
        tracker.record_error("HTTP 500 from /data");

        let stats = tracker.get_stats();
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.successful_requests, 1);
        assert_eq!(stats.failed_requests, 1);
        assert_eq!(stats.average_response_time_ms, 200.0);
        assert_eq!(stats.last_error.as_deref(), Some("HTTP 500 from /data"));
    }

    #[test]
    fn test_empty_average() {
        let stats = ApiStatsTracker::new().get_stats();
        assert_eq!(stats.average_response_time_ms, 0.0);
    }
}
