/// Base HTTP client for the upstream telemetry API
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;

/// HTTP client wrapper with timeout and default headers
pub struct HttpClient {
    client: Client,
    timeout: Duration,
}

impl HttpClient {
    /// Client with a per-request timeout and no default headers
    pub fn new(timeout: Duration) -> Result<Self, String> {
        Self::build(timeout, HeaderMap::new())
    }

    /// Client sending `Authorization: Bearer <token>` and a JSON content type
    ///
    /// An empty token omits the authorization header.
    pub fn with_bearer(timeout: Duration, token: &str) -> Result<Self, String> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if !token.is_empty() {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| format!("Invalid bearer token: {}", e))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        Self::build(timeout, headers)
    }

    /// Client for long-lived responses: bounded connect, unbounded body
    pub fn streaming(connect_timeout: Duration) -> Result<Self, String> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| format!("Failed to create streaming HTTP client: {}", e))?;

        Ok(Self {
            client,
            timeout: connect_timeout,
        })
    }

    fn build(timeout: Duration, headers: HeaderMap) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self { client, timeout })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout.as_millis() as u64
    }
}
