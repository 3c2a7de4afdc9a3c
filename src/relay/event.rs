/// Events pushed down a live stream
///
/// Wire shape (one JSON object per SSE `data:` frame):
/// - `{"type":"connection","message":"Connected to live updates","device_id":"bus-1"}`
/// - `{"type":"update","timestamp":"2024-05-01T10:00:00.000Z","device_id":"bus-1","data":{...}}`
/// - `{"type":"error","timestamp":"...","device_id":"bus-1","message":"..."}`
use crate::types::{iso_millis, DeviceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const CONNECTED_MESSAGE: &str = "Connected to live updates";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RelayEvent {
    Connection {
        message: String,
        /// Empty when the sender did not tag the event
        #[serde(default)]
        device_id: String,
    },
    Update {
        #[serde(with = "iso_millis")]
        timestamp: DateTime<Utc>,
        #[serde(default)]
        device_id: String,
        data: Value,
    },
    Error {
        #[serde(with = "iso_millis")]
        timestamp: DateTime<Utc>,
        #[serde(default)]
        device_id: String,
        message: String,
    },
}

impl RelayEvent {
    pub fn connection(device_id: &DeviceId) -> Self {
        RelayEvent::Connection {
            message: CONNECTED_MESSAGE.to_string(),
            device_id: device_id.to_string(),
        }
    }

    pub fn update(device_id: &DeviceId, data: Value) -> Self {
        RelayEvent::Update {
            timestamp: Utc::now(),
            device_id: device_id.to_string(),
            data,
        }
    }

    pub fn error(device_id: &DeviceId, message: impl Into<String>) -> Self {
        RelayEvent::Error {
            timestamp: Utc::now(),
            device_id: device_id.to_string(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RelayEvent::Connection { .. } => "connection",
            RelayEvent::Update { .. } => "update",
            RelayEvent::Error { .. } => "error",
        }
    }

    pub fn device_id(&self) -> &str {
        match self {
            RelayEvent::Connection { device_id, .. }
            | RelayEvent::Update { device_id, .. }
            | RelayEvent::Error { device_id, .. } => device_id,
        }
    }

    /// Whether the event was produced for `device_id` (untagged events match anything)
    pub fn belongs_to(&self, device_id: &DeviceId) -> bool {
        let tag = self.device_id();
        tag.is_empty() || tag == device_id.as_str()
    }

    pub fn is_update(&self) -> bool {
        matches!(self, RelayEvent::Update { .. })
    }

    pub fn to_json(&self) -> String {
        // Serializing a tagged enum of strings and JSON values cannot fail
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}
