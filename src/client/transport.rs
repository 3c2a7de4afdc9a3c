/// Network side of the client: baseline fetches and live stream connections
use crate::apis::client::HttpClient;
use crate::apis::telemetry::device_ids;
use crate::config::ClientConfig;
use crate::errors::{ApiError, SseError, TrackerError};
use crate::logger::{self, LogTag};
use crate::relay::RelayEvent;
use crate::types::{DeviceId, PositionSnapshot};
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use std::collections::VecDeque;
use std::pin::Pin;

use super::sse::{parse_event, SseDecoder};

/// Decoded events of one stream connection; an `Err` item ends the stream
pub type EventStream = Pin<Box<dyn Stream<Item = Result<RelayEvent, TrackerError>> + Send>>;

#[async_trait]
pub trait RelayTransport: Send + Sync + 'static {
    /// One-shot latest report for `device_id`
    async fn fetch_baseline(&self, device_id: &DeviceId) -> Result<Value, TrackerError>;

    /// Open the live stream for `device_id`
    async fn open_stream(&self, device_id: &DeviceId) -> Result<EventStream, TrackerError>;
}

/// Baseline snapshot, `None` when the device reports no coordinates
pub async fn fetch_baseline_snapshot(
    transport: &dyn RelayTransport,
    device_id: &DeviceId,
) -> Result<Option<PositionSnapshot>, TrackerError> {
    let payload = transport.fetch_baseline(device_id).await?;
    Ok(PositionSnapshot::from_payload(device_id.as_str(), &payload))
}

/// Talks to a relay server over HTTP (`/proxy/data`, `/proxy/live`)
pub struct HttpRelayClient {
    http_client: HttpClient,
    stream_client: HttpClient,
    server_url: String,
}

impl HttpRelayClient {
    pub fn new(config: &ClientConfig) -> Result<Self, String> {
        Ok(Self {
            http_client: HttpClient::new(config.request_timeout())?,
            stream_client: HttpClient::streaming(config.request_timeout())?,
            server_url: config.server_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Device ids known to the upstream, via `/proxy/devices`
    pub async fn fetch_device_ids(&self) -> Result<Vec<String>, TrackerError> {
        let body = self.get_json("/proxy/devices", None).await?;
        Ok(device_ids(&body))
    }

    async fn get_json(
        &self,
        endpoint: &str,
        device_id: Option<&DeviceId>,
    ) -> Result<Value, TrackerError> {
        let timeout_ms = self.http_client.timeout_ms();
        let mut request = self
            .http_client
            .client()
            .get(format!("{}{}", self.server_url, endpoint));
        if let Some(id) = device_id {
            request = request.query(&[("device_id", id.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(e, timeout_ms))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::HttpStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            }
            .into());
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| ApiError::from_reqwest(e, timeout_ms))?;
        Ok(body)
    }
}

#[async_trait]
impl RelayTransport for HttpRelayClient {
    async fn fetch_baseline(&self, device_id: &DeviceId) -> Result<Value, TrackerError> {
        self.get_json("/proxy/data", Some(device_id)).await
    }

    async fn open_stream(&self, device_id: &DeviceId) -> Result<EventStream, TrackerError> {
        let response = self
            .stream_client
            .client()
            .get(format!("{}/proxy/live", self.server_url))
            .query(&[("device_id", device_id.as_str())])
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| TrackerError::TransportClosed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrackerError::TransportClosed(format!(
                "live stream refused with HTTP {}",
                status.as_u16()
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with("text/event-stream") {
            return Err(TrackerError::TransportClosed(
                SseError::UnexpectedContentType(content_type).to_string(),
            ));
        }

        logger::debug(
            LogTag::Client,
            &format!("Live stream connected for {}", device_id),
        );

        Ok(decode_events(response.bytes_stream()))
    }
}

/// Turn a raw body into relay events; malformed frames are skipped
pub fn decode_events<S, B, E>(body: S) -> EventStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    let state = (Box::pin(body), SseDecoder::new(), VecDeque::new());

    let events = futures::stream::unfold(Some(state), |state| async move {
        let (mut body, mut decoder, mut ready) = state?;
        loop {
            if let Some(event) = ready.pop_front() {
                return Some((Ok(event), Some((body, decoder, ready))));
            }

            match body.next().await {
                Some(Ok(chunk)) => {
                    for frame in decoder.push(chunk.as_ref()) {
                        match parse_event(&frame) {
                            Ok(event) => ready.push_back(event),
                            Err(e) => logger::warning(
                                LogTag::Client,
                                &format!("Skipping live frame: {}", e),
                            ),
                        }
                    }
                }
                Some(Err(e)) => {
                    return Some((Err(TrackerError::TransportClosed(e.to_string())), None));
                }
                None => {
                    return Some((
                        Err(TrackerError::TransportClosed("stream ended".to_string())),
                        None,
                    ));
                }
            }
        }
    });

    Box::pin(events)
}
