/// Response helpers shared by route handlers
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::{ApiError, TrackerError};

/// Error body: `{"error": "...", "message": "..."}`
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// 200 with a JSON body
pub fn success_response<T: Serialize>(body: T) -> Response {
    (StatusCode::OK, Json(body)).into_response()
}

pub fn error_response(status: StatusCode, error: &str, message: Option<&str>) -> Response {
    let body = ErrorBody {
        error: error.to_string(),
        message: message.map(str::to_string),
    };
    (status, Json(body)).into_response()
}

/// Upstream failures keep the upstream's status when it answered, 500 otherwise
pub fn upstream_error_response(error: &str, cause: &ApiError) -> Response {
    let status = cause
        .upstream_status()
        .and_then(|code| StatusCode::from_u16(code).ok())
        .filter(|status| !status.is_success())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    error_response(status, error, Some(&cause.to_string()))
}

impl IntoResponse for TrackerError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        match self {
            TrackerError::InvalidArgument(reason) => {
                error_response(StatusCode::BAD_REQUEST, &reason, Some(&message))
            }
            TrackerError::UpstreamUnavailable(cause) => {
                upstream_error_response("Upstream request failed", &cause)
            }
            TrackerError::TransportClosed(_) | TrackerError::Configuration(_) => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                Some(&message),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_status_passthrough() {
        let not_found = ApiError::HttpStatus {
            endpoint: "/data".to_string(),
            status: 404,
        };
        assert_eq!(
            upstream_error_response("Failed to fetch device data", &not_found).status(),
            StatusCode::NOT_FOUND
        );

        let timeout = ApiError::Timeout { timeout_ms: 10_000 };
        assert_eq!(
            upstream_error_response("Failed to fetch device data", &timeout).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_invalid_argument_is_bad_request() {
        let response =
            TrackerError::InvalidArgument("device_id parameter is required".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
