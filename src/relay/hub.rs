/// Live relay hub - one polling feed per tracked device, fanned out to subscribers
///
/// The hub owns:
/// - The feed registry (device → running poll task + broadcast sender)
/// - Subscriber reference counts, so a feed stops with its last subscriber
/// - Relay metrics
use crate::apis::TelemetrySource;
use crate::config::RelayConfig;
use crate::errors::TrackerError;
use crate::logger::{self, LogTag};
use crate::types::DeviceId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::event::RelayEvent;
use super::metrics::RelayMetrics;
use super::subscription::{Subscription, SubscriptionId};

/// Latest `update` of a feed; the lock also orders publishing against joins
type LatestUpdate = Arc<Mutex<Option<RelayEvent>>>;

struct Feed {
    /// Distinguishes a restarted feed from the one it replaced
    generation: u64,
    sender: broadcast::Sender<RelayEvent>,
    latest: LatestUpdate,
    subscribers: usize,
    task: JoinHandle<()>,
}

pub struct RelayHub {
    source: Arc<dyn TelemetrySource>,
    config: RelayConfig,
    feeds: Mutex<HashMap<DeviceId, Feed>>,
    next_subscription_id: AtomicU64,
    next_feed_generation: AtomicU64,
    metrics: Arc<RelayMetrics>,
}

impl RelayHub {
    pub fn new(source: Arc<dyn TelemetrySource>, config: RelayConfig) -> Arc<Self> {
        Arc::new(Self {
            source,
            config,
            feeds: Mutex::new(HashMap::new()),
            next_subscription_id: AtomicU64::new(1),
            next_feed_generation: AtomicU64::new(1),
            metrics: RelayMetrics::new(),
        })
    }

    /// Open a live stream for `device_id`
    ///
    /// The returned subscription yields `connection` first, then the feed's
    /// latest update when joining a running feed, then one event per poll.
    /// Must be called inside a tokio runtime.
    pub fn open_stream(self: &Arc<Self>, device_id: &str) -> Result<Subscription, TrackerError> {
        let device_id = DeviceId::parse(device_id)?;
        let subscription_id = self.next_subscription_id.fetch_add(1, Ordering::Relaxed);

        let (receiver, replay, subscribers, generation, started) = {
            let mut feeds = self.feeds.lock();
            match feeds.get_mut(&device_id) {
                Some(feed) => {
                    feed.subscribers += 1;
                    let latest = feed.latest.lock();
                    let receiver = feed.sender.subscribe();
                    let replay = if self.config.replay_latest {
                        latest.clone()
                    } else {
                        None
                    };
                    (receiver, replay, feed.subscribers, feed.generation, false)
                }
                None => {
                    let (feed, receiver) = self.start_feed(&device_id);
                    let generation = feed.generation;
                    feeds.insert(device_id.clone(), feed);
                    (receiver, None, 1, generation, true)
                }
            }
        };

        if started {
            logger::info(
                LogTag::Relay,
                &format!(
                    "Feed started for {} (every {}s)",
                    device_id, self.config.poll_interval_secs
                ),
            );
        }

        self.metrics.subscription_opened();
        logger::debug(
            LogTag::Relay,
            &format!(
                "Subscription {} opened for {} (subscribers={}, replay={})",
                subscription_id,
                device_id,
                subscribers,
                replay.is_some()
            ),
        );

        Ok(Subscription::new(
            subscription_id,
            device_id,
            generation,
            receiver,
            replay,
            Arc::clone(self),
        ))
    }

    /// Spawn the poll task; the first receiver exists before the first tick
    fn start_feed(&self, device_id: &DeviceId) -> (Feed, broadcast::Receiver<RelayEvent>) {
        let (sender, receiver) = broadcast::channel(self.config.channel_capacity.max(1));
        let latest: LatestUpdate = Arc::new(Mutex::new(None));

        let task = tokio::spawn(run_feed(
            device_id.clone(),
            Arc::clone(&self.source),
            sender.clone(),
            Arc::clone(&latest),
            self.config.poll_interval(),
            Arc::clone(&self.metrics),
        ));
        self.metrics.feed_started();

        let feed = Feed {
            generation: self.next_feed_generation.fetch_add(1, Ordering::Relaxed),
            sender,
            latest,
            subscribers: 1,
            task,
        };
        (feed, receiver)
    }

    /// Called exactly once per subscription
    ///
    /// Subscriptions of a feed that was already torn down (shutdown) never
    /// touch a newer feed for the same device.
    pub(super) fn release(
        &self,
        device_id: &DeviceId,
        generation: u64,
        subscription_id: SubscriptionId,
    ) {
        let stopped = {
            let mut feeds = self.feeds.lock();
            let remaining = match feeds.get_mut(device_id) {
                Some(feed) if feed.generation == generation => {
                    feed.subscribers = feed.subscribers.saturating_sub(1);
                    Some(feed.subscribers)
                }
                _ => None,
            };
            if remaining == Some(0) {
                feeds.remove(device_id)
            } else {
                None
            }
        };

        self.metrics.subscription_closed();
        logger::debug(
            LogTag::Relay,
            &format!("Subscription {} closed for {}", subscription_id, device_id),
        );

        if let Some(feed) = stopped {
            feed.task.abort();
            self.metrics.feed_stopped();
            logger::info(
                LogTag::Relay,
                &format!("Feed stopped for {} (no subscribers left)", device_id),
            );
        }
    }

    pub fn metrics(&self) -> &Arc<RelayMetrics> {
        &self.metrics
    }

    pub fn active_feeds(&self) -> usize {
        self.feeds.lock().len()
    }

    pub fn subscriber_count(&self, device_id: &DeviceId) -> usize {
        self.feeds
            .lock()
            .get(device_id)
            .map(|feed| feed.subscribers)
            .unwrap_or(0)
    }

    /// Abort every feed (server shutdown); open subscriptions end with `None`
    pub fn shutdown(&self) {
        let drained: Vec<(DeviceId, Feed)> = self.feeds.lock().drain().collect();
        for (device_id, feed) in drained {
            feed.task.abort();
            self.metrics.feed_stopped();
            logger::debug(
                LogTag::Relay,
                &format!("Feed for {} aborted on shutdown", device_id),
            );
        }
    }
}

/// Poll loop of one feed; the first tick fires immediately
async fn run_feed(
    device_id: DeviceId,
    source: Arc<dyn TelemetrySource>,
    sender: broadcast::Sender<RelayEvent>,
    latest: LatestUpdate,
    interval: Duration,
    metrics: Arc<RelayMetrics>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let event = match source.fetch_device_data(&device_id).await {
            Ok(data) => {
                metrics.poll_completed(true);
                RelayEvent::update(&device_id, data)
            }
            Err(e) => {
                metrics.poll_completed(false);
                logger::warning(
                    LogTag::Relay,
                    &format!("Poll failed for {}: {}", device_id, e),
                );
                RelayEvent::error(&device_id, e.to_string())
            }
        };

        {
            let mut latest_update = latest.lock();
            if event.is_update() {
                *latest_update = Some(event.clone());
            }
            // No receivers only happens between the last release and the abort
            if let Ok(receivers) = sender.send(event) {
                metrics.events_delivered(receivers);
            }
        }
    }
}
