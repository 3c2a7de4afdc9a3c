/// Shared application state for the webserver
use crate::apis::TelemetrySource;
use crate::config::AppConfig;
use crate::relay::RelayHub;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Shared application state passed to all route handlers
#[derive(Clone)]
pub struct AppState {
    /// Immutable configuration, built once at startup
    pub config: Arc<AppConfig>,

    /// Upstream telemetry API
    pub telemetry: Arc<dyn TelemetrySource>,

    /// Live relay feeds
    pub relay: Arc<RelayHub>,

    /// Server startup time
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, telemetry: Arc<dyn TelemetrySource>) -> Self {
        let relay = RelayHub::new(Arc::clone(&telemetry), config.relay.clone());

        Self {
            config,
            telemetry,
            relay,
            startup_time: Utc::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        (Utc::now() - self.startup_time).num_seconds().max(0) as u64
    }
}
