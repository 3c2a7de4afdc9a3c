/// Domain types shared by the relay server and the client reconciler
use crate::errors::TrackerError;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Message returned when a request names no device
pub const MISSING_DEVICE_ID: &str = "device_id parameter is required";

// =============================================================================
// DEVICE ID
// =============================================================================

/// Opaque identifier of a tracked vehicle (never empty)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Validate a raw id; surrounding whitespace is trimmed
    pub fn parse(raw: &str) -> Result<Self, TrackerError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TrackerError::InvalidArgument(MISSING_DEVICE_ID.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// POSITION SNAPSHOT
// =============================================================================

/// One immutable position report of a device
///
/// `payload` keeps the upstream object untouched so nothing is lost when a
/// snapshot is re-published or displayed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionSnapshot {
    pub device_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub payload: Value,
}

impl PositionSnapshot {
    /// Build a snapshot from an upstream `/data` object
    ///
    /// Returns `None` when the payload carries no usable coordinates.
    pub fn from_payload(fallback_device_id: &str, payload: &Value) -> Option<Self> {
        let latitude = payload.get("lat").and_then(number_field)?;
        let longitude = payload
            .get("lng")
            .and_then(number_field)
            .or_else(|| payload.get("lon").and_then(number_field))?;

        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return None;
        }

        let device_id = payload
            .get("device_id")
            .and_then(Value::as_str)
            .filter(|id| !id.trim().is_empty())
            .unwrap_or(fallback_device_id)
            .to_string();

        let timestamp = payload
            .get("timestamp")
            .and_then(timestamp_field)
            .or_else(|| payload.get("last_ts").and_then(timestamp_field));

        Some(Self {
            device_id,
            latitude,
            longitude,
            speed: payload.get("speed").and_then(number_field),
            timestamp,
            payload: payload.clone(),
        })
    }

    /// True when `self` is strictly older than `other`
    ///
    /// Snapshots without a timestamp are never considered older.
    pub fn is_older_than(&self, other: &PositionSnapshot) -> bool {
        match (self.timestamp, other.timestamp) {
            (Some(mine), Some(theirs)) => mine < theirs,
            _ => false,
        }
    }
}

/// Numbers may arrive as JSON numbers or numeric strings
fn number_field(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// RFC 3339 strings, or unix epoch in seconds / milliseconds
fn timestamp_field(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|| s.trim().parse::<i64>().ok().and_then(epoch_to_utc)),
        Value::Number(n) => n.as_i64().and_then(epoch_to_utc),
        _ => None,
    }
}

fn epoch_to_utc(raw: i64) -> Option<DateTime<Utc>> {
    // Anything past year 5138 in seconds is treated as milliseconds
    if raw.abs() >= 100_000_000_000 {
        Utc.timestamp_millis_opt(raw).single()
    } else {
        Utc.timestamp_opt(raw, 0).single()
    }
}

// =============================================================================
// TIMESTAMP FORMAT
// =============================================================================

/// ISO 8601 UTC with millisecond precision (`2024-05-01T10:00:00.000Z`)
pub mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(
        value: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
