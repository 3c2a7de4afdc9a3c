/// Error taxonomy for the tracker
///
/// - `InvalidArgument`: caller mistakes (missing `device_id`), never retried
/// - `UpstreamUnavailable`: the telemetry API failed; recovered locally
/// - `TransportClosed`: the push connection itself died; drives reconnects
/// - `Configuration`: startup problems, fatal
///
/// `SseError` covers malformed frames on the client side of a live stream.
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(#[from] ApiError),

    #[error("Transport closed: {0}")]
    TransportClosed(String),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

impl TrackerError {
    /// Whether the operation may succeed if simply attempted again later
    pub fn is_recoverable(&self) -> bool {
        match self {
            TrackerError::UpstreamUnavailable(_) => true,
            TrackerError::TransportClosed(_) => true,
            TrackerError::InvalidArgument(_) => false,
            TrackerError::Configuration(_) => false,
        }
    }
}

pub type TrackerResult<T> = Result<T, TrackerError>;

// =============================================================================
// UPSTREAM API ERRORS
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP {status} from {endpoint}")]
    HttpStatus { endpoint: String, status: u16 },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ApiError {
    /// Map a reqwest failure onto the taxonomy
    pub fn from_reqwest(error: reqwest::Error, timeout_ms: u64) -> Self {
        if error.is_timeout() {
            ApiError::Timeout { timeout_ms }
        } else if error.is_decode() {
            ApiError::InvalidResponse(error.to_string())
        } else if let Some(status) = error.status() {
            ApiError::HttpStatus {
                endpoint: error
                    .url()
                    .map(|u| u.path().to_string())
                    .unwrap_or_default(),
                status: status.as_u16(),
            }
        } else {
            ApiError::Network(error.to_string())
        }
    }

    /// Upstream HTTP status, when the upstream answered at all
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            ApiError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

// =============================================================================
// CONFIGURATION ERRORS
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {reason}")]
    Read { path: String, reason: String },

    #[error("Failed to parse config file '{path}': {reason}")]
    Parse { path: String, reason: String },

    #[error("Invalid config field '{field}': {reason}")]
    InvalidField { field: String, reason: String },
}

// =============================================================================
// LIVE STREAM DECODING ERRORS
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SseError {
    #[error("Invalid event payload: {0}")]
    InvalidPayload(String),

    #[error("Unexpected content type '{0}'")]
    UnexpectedContentType(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(TrackerError::from(ApiError::Network("refused".into())).is_recoverable());
        assert!(TrackerError::TransportClosed("eof".into()).is_recoverable());
        assert!(!TrackerError::InvalidArgument("device_id".into()).is_recoverable());
    }

    #[test]
    fn test_api_error_messages() {
        let err = ApiError::HttpStatus {
            endpoint: "/data".to_string(),
            status: 500,
        };
        assert_eq!(err.to_string(), "HTTP 500 from /data");
        assert_eq!(err.upstream_status(), Some(500));
        let timeout = ApiError::Timeout { timeout_ms: 10_000 };
        assert_eq!(timeout.upstream_status(), None);
    }
}
