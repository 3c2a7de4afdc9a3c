/// Client side of the live relay
///
/// Keeps a map-facing view of one device consistent with a one-shot baseline
/// fetch and the pushed stream:
/// - `machine`: pure state machine (inputs in, commands out)
/// - `reconciler`: tokio driver owning stream and reconnect timer
/// - `state`: baseline/overlay merge rules and notices
/// - `transport`: HTTP access to a relay server
/// - `sse`: incremental `text/event-stream` decoder
pub mod machine;
pub mod reconciler;
pub mod sse;
pub mod state;
pub mod transport;

pub use machine::{Phase, ViewSnapshot};
pub use reconciler::LiveReconciler;
pub use state::{ClientViewState, Notice};
pub use transport::{fetch_baseline_snapshot, HttpRelayClient, RelayTransport};
