/// Upstream passthrough endpoints
///
/// Bodies are forwarded untouched; failures keep the upstream status.
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    errors::TrackerError,
    logger::{self, LogTag},
    types::DeviceId,
    webserver::{
        state::AppState,
        utils::{success_response, upstream_error_response},
    },
};

/// `?device_id=<id>`
#[derive(Debug, Default, Deserialize)]
pub struct DeviceQuery {
    pub device_id: Option<String>,
}

impl DeviceQuery {
    pub fn device_id(&self) -> Result<DeviceId, TrackerError> {
        DeviceId::parse(self.device_id.as_deref().unwrap_or_default())
    }
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/devices", get(get_devices))
        .route("/data", get(get_device_data))
        .route("/history", get(get_device_history))
}

/// GET /proxy/devices
async fn get_devices(State(state): State<Arc<AppState>>) -> Response {
    match state.telemetry.fetch_devices().await {
        Ok(body) => success_response(body),
        Err(e) => {
            logger::error(LogTag::Webserver, &format!("Error fetching devices: {}", e));
            upstream_error_response("Failed to fetch devices", &e)
        }
    }
}

/// GET /proxy/data?device_id=X
async fn get_device_data(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DeviceQuery>,
) -> Response {
    let device_id = match query.device_id() {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match state.telemetry.fetch_device_data(&device_id).await {
        Ok(body) => success_response(body),
        Err(e) => {
            logger::error(
                LogTag::Webserver,
                &format!("Error fetching data for {}: {}", device_id, e),
            );
            upstream_error_response("Failed to fetch device data", &e)
        }
    }
}

/// GET /proxy/history?device_id=X
async fn get_device_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DeviceQuery>,
) -> Response {
    let device_id = match query.device_id() {
        Ok(id) => id,
        Err(e) => return e.into_response(),
    };

    match state.telemetry.fetch_device_history(&device_id).await {
        Ok(body) => success_response(body),
        Err(e) => {
            logger::error(
                LogTag::Webserver,
                &format!("Error fetching history for {}: {}", device_id, e),
            );
            upstream_error_response("Failed to fetch device history", &e)
        }
    }
}
