/// Vehicle telemetry API client
///
/// Endpoints (all `GET`, bearer token, JSON):
/// 1. `/devices` - registered devices
/// 2. `/data?device_id=X` - latest report of one device
/// 3. `/history?device_id=X` - recent reports of one device
pub mod types;

use crate::apis::client::HttpClient;
use crate::apis::stats::{ApiStats, ApiStatsTracker};
use crate::config::UpstreamConfig;
use crate::errors::ApiError;
use crate::logger::{self, LogTag};
use crate::types::DeviceId;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

pub use types::device_ids;

/// Anything that can answer telemetry queries
///
/// Implemented by [`TelemetryClient`]; tests substitute scripted fakes.
#[async_trait]
pub trait TelemetrySource: Send + Sync + 'static {
    async fn fetch_devices(&self) -> Result<Value, ApiError>;

    async fn fetch_device_data(&self, device_id: &DeviceId) -> Result<Value, ApiError>;

    async fn fetch_device_history(&self, device_id: &DeviceId) -> Result<Value, ApiError>;

    fn stats(&self) -> Option<ApiStats> {
        None
    }
}

pub struct TelemetryClient {
    http_client: HttpClient,
    base_url: String,
    stats: Arc<ApiStatsTracker>,
}

impl TelemetryClient {
    pub fn new(config: &UpstreamConfig) -> Result<Self, String> {
        let http_client = HttpClient::with_bearer(config.timeout(), &config.token)?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            stats: Arc::new(ApiStatsTracker::new()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json(
        &self,
        endpoint: &str,
        device_id: Option<&DeviceId>,
    ) -> Result<Value, ApiError> {
        let start = Instant::now();
        let url = format!("{}{}", self.base_url, endpoint);

        let mut request = self.http_client.client().get(&url);
        if let Some(id) = device_id {
            request = request.query(&[("device_id", id.as_str())]);
        }

        if logger::is_debug_enabled(&LogTag::Upstream) {
            logger::debug(
                LogTag::Upstream,
                &format!(
                    "GET {} device_id={}",
                    url,
                    device_id.map(DeviceId::as_str).unwrap_or("-")
                ),
            );
        }

        let timeout_ms = self.http_client.timeout_ms();
        let result = async {
            let response = request
                .send()
                .await
                .map_err(|e| ApiError::from_reqwest(e, timeout_ms))?;

            let status = response.status();
            if !status.is_success() {
                return Err(ApiError::HttpStatus {
                    endpoint: endpoint.to_string(),
                    status: status.as_u16(),
                });
            }

            response
                .json::<Value>()
                .await
                .map_err(|e| ApiError::from_reqwest(e, timeout_ms))
        }
        .await;

        let elapsed = start.elapsed().as_millis() as u64;
        self.stats.record_request(result.is_ok(), elapsed);

        if let Err(e) = &result {
            self.stats.record_error(&e.to_string());
            logger::warning(
                LogTag::Upstream,
                &format!("{} failed after {}ms: {}", endpoint, elapsed, e),
            );
        }

        result
    }
}

#[async_trait]
impl TelemetrySource for TelemetryClient {
    async fn fetch_devices(&self) -> Result<Value, ApiError> {
        self.get_json("/devices", None).await
    }

    async fn fetch_device_data(&self, device_id: &DeviceId) -> Result<Value, ApiError> {
        self.get_json("/data", Some(device_id)).await
    }

    async fn fetch_device_history(&self, device_id: &DeviceId) -> Result<Value, ApiError> {
        self.get_json("/history", Some(device_id)).await
    }

    fn stats(&self) -> Option<ApiStats> {
        Some(self.stats.get_stats())
    }
}
