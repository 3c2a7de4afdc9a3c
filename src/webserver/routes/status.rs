use axum::{extract::State, response::Response, routing::get, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    apis::ApiStats,
    logger::{self, LogTag},
    relay::RelayMetricsSnapshot,
    webserver::{state::AppState, utils::success_response},
};

/// Health check response
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime_seconds: u64,
    pub relay: RelayMetricsSnapshot,
    pub upstream: Option<ApiStats>,
}

/// Create status routes
pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health_check))
}

/// GET /health
async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    logger::debug(LogTag::Webserver, "Health check endpoint called");

    let response = HealthResponse {
        status: "OK".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        relay: state.relay.metrics().snapshot(),
        upstream: state.telemetry.stats(),
    };

    success_response(response)
}
