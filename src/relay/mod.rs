/// Live position relay
///
/// Polls the upstream for the latest position of each watched device and pushes
/// every result to that device's subscribers:
/// - `hub`: feed registry, one poll task per device, fan-out through broadcast
/// - `subscription`: per-client handle (`connection` first, idempotent close)
/// - `event`: the `connection` / `update` / `error` wire events
/// - `metrics`: counters served by `/health`
pub mod event;
pub mod hub;
pub mod metrics;
pub mod subscription;

pub use event::RelayEvent;
pub use hub::RelayHub;
pub use metrics::{RelayMetrics, RelayMetricsSnapshot};
pub use subscription::{Subscription, SubscriptionId};
