/// Configuration schemas - every section defined once with its defaults
use crate::config_struct;
use std::time::Duration;

// ============================================================================
// UPSTREAM TELEMETRY API
// ============================================================================

config_struct! {
    /// Connection settings for the upstream telemetry API
    pub struct UpstreamConfig {
        /// Base URL, e.g. `http://10.0.0.5:3000` (env: BASE_URL)
        base_url: String = "http://127.0.0.1:3000".to_string(),

        /// Bearer token sent on every request (env: BUS_API_TOKEN or AUTH_TOKEN)
        token: String = String::new(),

        /// Per-request timeout
        timeout_secs: u64 = 10,
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ============================================================================
// WEBSERVER
// ============================================================================

config_struct! {
    /// Listen address and CORS policy of the HTTP surface
    pub struct WebserverConfig {
        /// Host/IP to bind (env: HOST)
        host: String = "0.0.0.0".to_string(),

        /// Port to bind (env: PORT)
        port: u16 = 3001,

        /// Send `Access-Control-Allow-Origin: *`
        cors_allow_any_origin: bool = true,
    }
}

// ============================================================================
// LIVE RELAY
// ============================================================================

config_struct! {
    /// Polling and fan-out behaviour of the live relay
    pub struct RelayConfig {
        /// Seconds between upstream polls of one tracked device
        poll_interval_secs: u64 = 5,

        /// Seconds between SSE keep-alive comments (0 disables them)
        keep_alive_secs: u64 = 15,

        /// Per-feed broadcast buffer; slower subscribers skip older events
        channel_capacity: usize = 32,

        /// Send the feed's latest update to subscribers joining a running feed
        replay_latest: bool = true,
    }
}

impl RelayConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn keep_alive(&self) -> Option<Duration> {
        (self.keep_alive_secs > 0).then(|| Duration::from_secs(self.keep_alive_secs))
    }
}

// ============================================================================
// CLIENT RECONCILER
// ============================================================================

config_struct! {
    /// Settings for the stream-consuming client
    pub struct ClientConfig {
        /// Relay server the client talks to
        server_url: String = "http://127.0.0.1:3001".to_string(),

        /// Fixed delay before reopening a dead stream
        reconnect_delay_secs: u64 = 5,

        /// Timeout for baseline requests and for establishing the stream
        request_timeout_secs: u64 = 10,
    }
}

impl ClientConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ============================================================================
// LOGGING
// ============================================================================

config_struct! {
    /// Log output settings (console levels come from command-line flags)
    pub struct LoggingConfig {
        /// Append log lines to this file; empty disables file logging
        file: String = String::new(),
    }
}

// ============================================================================
// ROOT
// ============================================================================

config_struct! {
    /// Complete tracker configuration, built once at startup
    pub struct AppConfig {
        upstream: UpstreamConfig = UpstreamConfig::default(),
        webserver: WebserverConfig = WebserverConfig::default(),
        relay: RelayConfig = RelayConfig::default(),
        client: ClientConfig = ClientConfig::default(),
        logging: LoggingConfig = LoggingConfig::default(),
    }
}
