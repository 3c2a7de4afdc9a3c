/// Upstream API clients
///
/// - `client`: shared reqwest wrapper (timeout, bearer headers)
/// - `stats`: per-client request statistics
/// - `telemetry`: the vehicle telemetry API (devices, latest data, history)
pub mod client;
pub mod stats;
pub mod telemetry;

pub use client::HttpClient;
pub use stats::{ApiStats, ApiStatsTracker};
pub use telemetry::{TelemetryClient, TelemetrySource};
