/// One client's view of a shared feed
use crate::logger::{self, LogTag};
use crate::types::DeviceId;
use futures::Stream;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

use super::event::RelayEvent;
use super::hub::RelayHub;

pub type SubscriptionId = u64;

/// Live stream handle returned by [`RelayHub::open_stream`]
///
/// Dropping the handle releases it; `close` does the same eagerly and both
/// may run.
pub struct Subscription {
    id: SubscriptionId,
    device_id: DeviceId,
    generation: u64,
    /// Dropped on close so the feed stops counting this handle
    receiver: Option<broadcast::Receiver<RelayEvent>>,
    pending: VecDeque<RelayEvent>,
    /// `None` once released
    hub: Option<Arc<RelayHub>>,
}

impl Subscription {
    pub(super) fn new(
        id: SubscriptionId,
        device_id: DeviceId,
        generation: u64,
        receiver: broadcast::Receiver<RelayEvent>,
        replay: Option<RelayEvent>,
        hub: Arc<RelayHub>,
    ) -> Self {
        let mut pending = VecDeque::with_capacity(2);
        pending.push_back(RelayEvent::connection(&device_id));
        pending.extend(replay);

        Self {
            id,
            device_id,
            generation,
            receiver: Some(receiver),
            pending,
            hub: Some(hub),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    pub fn is_closed(&self) -> bool {
        self.hub.is_none()
    }

    /// Next event in generation order; `None` once closed
    pub async fn next_event(&mut self) -> Option<RelayEvent> {
        let hub = self.hub.as_ref()?;

        if let Some(event) = self.pending.pop_front() {
            return Some(event);
        }

        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    hub.metrics().events_lagged(skipped);
                    logger::warning(
                        LogTag::Relay,
                        &format!(
                            "Subscription {} for {} fell behind, skipped {} events",
                            self.id, self.device_id, skipped
                        ),
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Stop delivery and release the feed slot (idempotent)
    pub fn close(&mut self) {
        if let Some(hub) = self.hub.take() {
            self.pending.clear();
            self.receiver = None;
            hub.release(&self.device_id, self.generation, self.id);
        }
    }

    /// Adapt into a `Stream` for the SSE writer
    pub fn into_stream(self) -> impl Stream<Item = RelayEvent> + Send + 'static {
        futures::stream::unfold(self, |mut subscription| async move {
            let event = subscription.next_event().await?;
            Some((event, subscription))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.close();
    }
}
