/// Relay metrics (aggregate across all feeds)
use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
pub struct RelayMetrics {
    /// Feeds started (lifetime)
    feeds_started: AtomicU64,

    /// Feeds currently polling
    active_feeds: AtomicUsize,

    /// Subscriptions opened (lifetime)
    total_subscriptions: AtomicU64,

    /// Subscriptions currently open
    active_subscriptions: AtomicUsize,

    /// Upstream polls performed
    polls: AtomicU64,

    /// Polls that produced an `error` event
    poll_failures: AtomicU64,

    /// Event deliveries (one per receiving subscriber)
    events_delivered: AtomicU64,

    /// Events skipped by subscribers that fell behind
    events_lagged: AtomicU64,
}

impl RelayMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn feed_started(&self) {
        self.feeds_started.fetch_add(1, Ordering::Relaxed);
        self.active_feeds.fetch_add(1, Ordering::Relaxed);
    }

    pub fn feed_stopped(&self) {
        self.active_feeds.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn subscription_opened(&self) {
        self.total_subscriptions.fetch_add(1, Ordering::Relaxed);
        self.active_subscriptions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn subscription_closed(&self) {
        self.active_subscriptions.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn poll_completed(&self, success: bool) {
        self.polls.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.poll_failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn events_delivered(&self, receivers: usize) {
        self.events_delivered
            .fetch_add(receivers as u64, Ordering::Relaxed);
    }

    pub fn events_lagged(&self, count: u64) {
        self.events_lagged.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RelayMetricsSnapshot {
        RelayMetricsSnapshot {
            feeds_started: self.feeds_started.load(Ordering::Relaxed),
            active_feeds: self.active_feeds.load(Ordering::Relaxed),
            total_subscriptions: self.total_subscriptions.load(Ordering::Relaxed),
            active_subscriptions: self.active_subscriptions.load(Ordering::Relaxed),
            polls: self.polls.load(Ordering::Relaxed),
            poll_failures: self.poll_failures.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            events_lagged: self.events_lagged.load(Ordering::Relaxed),
        }
    }
}

/// Relay metrics snapshot (served by `/health`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelayMetricsSnapshot {
    pub feeds_started: u64,
    pub active_feeds: usize,
    pub total_subscriptions: u64,
    pub active_subscriptions: usize,
    pub polls: u64,
    pub poll_failures: u64,
    pub events_delivered: u64,
    pub events_lagged: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_metrics() {
        let metrics = RelayMetrics::new();

        metrics.feed_started();
        metrics.subscription_opened();
        metrics.subscription_opened();
        metrics.subscription_closed();
        metrics.poll_completed(true);
        metrics.poll_completed(false);
        metrics.events_delivered(2);
        metrics.events_lagged(3);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.active_feeds, 1);
        assert_eq!(snapshot.total_subscriptions, 2);
        assert_eq!(snapshot.active_subscriptions, 1);
        assert_eq!(snapshot.polls, 2);
        assert_eq!(snapshot.poll_failures, 1);
        assert_eq!(snapshot.events_delivered, 2);
        assert_eq!(snapshot.events_lagged, 3);
    }
}
