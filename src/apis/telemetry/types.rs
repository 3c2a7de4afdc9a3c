/// Response shapes of the telemetry API
use serde_json::Value;

/// Device ids from a `/devices` response
///
/// Accepts a bare array or an object wrapping it in `devices`; entries may be
/// plain strings or objects carrying `device_id` (or `id`).
pub fn device_ids(response: &Value) -> Vec<String> {
    let entries = match response {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("devices") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        _ => &[],
    };

    entries.iter().filter_map(device_id_of).collect()
}

fn device_id_of(entry: &Value) -> Option<String> {
    let raw = match entry {
        Value::String(id) => id.clone(),
        Value::Number(n) => n.to_string(),
        Value::Object(map) => match map.get("device_id").or_else(|| map.get("id")) {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return None,
        },
        _ => return None,
    };
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mixed_device_entries() {
        let response = json!([
            "bus-1",
            { "device_id": "bus-2", "name": "Route 9" },
            { "id": 7 },
            "",
            null
        ]);
        assert_eq!(device_ids(&response), vec!["bus-1", "bus-2", "7"]);
    }

    #[test]
    fn test_wrapped_device_list() {
        let response = json!({ "devices": [{ "device_id": "bus-3" }] });
        assert_eq!(device_ids(&response), vec!["bus-3"]);
        assert!(device_ids(&json!({ "error": "nope" })).is_empty());
    }
}
