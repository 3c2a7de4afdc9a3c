/// Configuration system
///
/// - `macros`: `config_struct!` for single-declaration sections with defaults
/// - `schemas`: every configuration section
/// - `utils`: loading from TOML, environment overrides, validation
pub mod macros;
pub mod schemas;
pub mod utils;

pub use schemas::{
    AppConfig, ClientConfig, LoggingConfig, RelayConfig, UpstreamConfig, WebserverConfig,
};
pub use utils::{apply_env_overrides, load_config, load_config_from_path, CONFIG_FILE_PATH};
