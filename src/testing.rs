/// Scripted upstream used by unit tests
use crate::apis::TelemetrySource;
use crate::errors::ApiError;
use crate::types::DeviceId;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Fake telemetry API
///
/// `fetch_device_data` pops scripted answers first and then falls back to a
/// generated position whose `seq` field counts the calls.
#[derive(Default)]
pub struct ScriptedTelemetry {
    script: Mutex<VecDeque<Result<Value, ApiError>>>,
    data_calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every data fetch takes `delay` of (tokio) time
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn push(&self, answer: Result<Value, ApiError>) {
        self.script.lock().push_back(answer);
    }

    pub fn data_calls(&self) -> usize {
        self.data_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TelemetrySource for ScriptedTelemetry {
    async fn fetch_devices(&self) -> Result<Value, ApiError> {
        Ok(json!(["bus-1", { "device_id": "bus-2" }]))
    }

    async fn fetch_device_data(&self, device_id: &DeviceId) -> Result<Value, ApiError> {
        let seq = self.data_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(answer) = self.script.lock().pop_front() {
            return answer;
        }
        Ok(json!({
            "device_id": device_id.as_str(),
            "lat": 12.9,
            "lng": 77.6,
            "speed": 30,
            "seq": seq,
        }))
    }

    async fn fetch_device_history(&self, device_id: &DeviceId) -> Result<Value, ApiError> {
        if device_id.as_str() == "broken" {
            return Err(ApiError::HttpStatus {
                endpoint: "/history".to_string(),
                status: 502,
            });
        }
        Ok(json!([
            { "device_id": device_id.as_str(), "lat": 12.8, "lng": 77.5 },
            { "device_id": device_id.as_str(), "lat": 12.9, "lng": 77.6 },
        ]))
    }
}
