/// Configuration loading - file, environment overrides and validation
///
/// The result is an immutable [`AppConfig`] that callers wrap in an `Arc`
/// and pass explicitly to every component that needs it.
use std::path::Path;

use super::schemas::AppConfig;
use crate::arguments;
use crate::errors::ConfigError;
use crate::logger::{self, LogTag};

/// Default configuration file path
pub const CONFIG_FILE_PATH: &str = "data/config.toml";

/// Load the configuration used by the server binary
///
/// Order: defaults < TOML file (`--config` or [`CONFIG_FILE_PATH`]) < `.env` < process env.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    dotenv::dotenv().ok();

    let path = arguments::get_config_path().unwrap_or_else(|| CONFIG_FILE_PATH.to_string());
    let mut config = load_config_from_path(&path)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config.validate()?;

    Ok(config)
}

/// Load a TOML file, falling back to defaults when the file does not exist
pub fn load_config_from_path(path: &str) -> Result<AppConfig, ConfigError> {
    if !Path::new(path).exists() {
        logger::warning(
            LogTag::Config,
            &format!("Config file '{}' not found, using default values", path),
        );
        return Ok(AppConfig::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_string(),
        reason: e.to_string(),
    })?;

    toml::from_str::<AppConfig>(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

/// Apply environment overrides through `lookup` (injectable for tests)
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(base_url) = non_empty("BASE_URL") {
        config.upstream.base_url = base_url.trim().to_string();
    }
    if let Some(token) = non_empty("BUS_API_TOKEN").or_else(|| non_empty("AUTH_TOKEN")) {
        config.upstream.token = token.trim().to_string();
    }
    if let Some(host) = non_empty("HOST") {
        config.webserver.host = host.trim().to_string();
    }
    if let Some(port) = non_empty("PORT") {
        match port.trim().parse::<u16>() {
            Ok(port) => config.webserver.port = port,
            Err(e) => logger::warning(
                LogTag::Config,
                &format!("Ignoring invalid PORT '{}': {}", port, e),
            ),
        }
    }
}

impl AppConfig {
    /// Reject configurations the server cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = self.upstream.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::InvalidField {
                field: "upstream.base_url".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        let parsed = url::Url::parse(base_url).map_err(|e| ConfigError::InvalidField {
            field: "upstream.base_url".to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidField {
                field: "upstream.base_url".to_string(),
                reason: format!("unsupported scheme '{}'", parsed.scheme()),
            });
        }
        if self.upstream.timeout_secs == 0 {
            return Err(ConfigError::InvalidField {
                field: "upstream.timeout_secs".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.webserver.port == 0 {
            return Err(ConfigError::InvalidField {
                field: "webserver.port".to_string(),
                reason: "must be between 1 and 65535".to_string(),
            });
        }
        if self.relay.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidField {
                field: "relay.poll_interval_secs".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.relay.channel_capacity == 0 {
            return Err(ConfigError::InvalidField {
                field: "relay.channel_capacity".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
