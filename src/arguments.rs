/// Centralized argument handling for the tracker binaries
///
/// Features:
/// - Global CMD_ARGS storage with thread-safe access
/// - Debug flag checks per subsystem
/// - Small helpers for flag values (`--config <path>`)
use once_cell::sync::Lazy;
use std::env;
use std::sync::Mutex;

/// Global command-line arguments storage
/// Tests and tool binaries can override it with [`set_cmd_args`]
pub static CMD_ARGS: Lazy<Mutex<Vec<String>>> = Lazy::new(|| Mutex::new(env::args().collect()));

/// Replace the stored arguments
pub fn set_cmd_args(args: Vec<String>) {
    if let Ok(mut cmd_args) = CMD_ARGS.lock() {
        *cmd_args = args;
    }
}

/// Copy of the current arguments (does not hold the lock)
pub fn get_cmd_args() -> Vec<String> {
    match CMD_ARGS.lock() {
        Ok(args) => args.clone(),
        Err(_) => env::args().collect(),
    }
}

/// Checks if a specific argument is present in the command line
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Value following a flag (`--config data/config.toml` -> `data/config.toml`)
pub fn get_arg_value(flag: &str) -> Option<String> {
    let args = get_cmd_args();
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .filter(|value| !value.starts_with("--"))
        .cloned()
}

// =============================================================================
// DEBUG FLAG CHECKING FUNCTIONS
// =============================================================================

/// Relay feed and subscription debug mode
pub fn is_debug_relay_enabled() -> bool {
    has_arg("--debug-relay")
}

/// Upstream telemetry API debug mode
pub fn is_debug_upstream_enabled() -> bool {
    has_arg("--debug-upstream")
}

/// HTTP routes debug mode
pub fn is_debug_webserver_enabled() -> bool {
    has_arg("--debug-webserver")
}

/// Client reconciler debug mode
pub fn is_debug_client_enabled() -> bool {
    has_arg("--debug-client")
}

/// Names of all enabled debug modes (for the startup banner)
pub fn get_enabled_debug_modes() -> Vec<&'static str> {
    let mut modes = Vec::new();
    if is_debug_relay_enabled() {
        modes.push("relay");
    }
    if is_debug_upstream_enabled() {
        modes.push("upstream");
    }
    if is_debug_webserver_enabled() {
        modes.push("webserver");
    }
    if is_debug_client_enabled() {
        modes.push("client");
    }
    modes
}

/// Path passed through `--config`, if any
pub fn get_config_path() -> Option<String> {
    get_arg_value("--config")
}

pub mod patterns {
    use super::has_arg;

    pub fn is_help_requested() -> bool {
        has_arg("--help") || has_arg("-h")
    }

    pub fn is_version_requested() -> bool {
        has_arg("--version") || has_arg("-V")
    }
}

const USAGE: &str = "\
Authenticated telemetry proxy with a live position relay (Server-Sent Events)

USAGE:
    bus-tracker [OPTIONS]

OPTIONS:
    --config <path>       TOML configuration file (default: data/config.toml)
    --debug-relay         Debug output for relay feeds and subscriptions
    --debug-upstream      Debug output for upstream API requests
    --debug-webserver     Debug output for HTTP routes
    --debug-client        Debug output for the client reconciler
    --verbose             Verbose output for every subsystem
    --quiet               Only print errors
    --log-tags <a,b>      Only print INFO/WARNING lines for these tags
    -h, --help            Print this help
    -V, --version         Print version

ENVIRONMENT:
    BASE_URL              Upstream telemetry API base URL
    BUS_API_TOKEN         Bearer token for the upstream API (AUTH_TOKEN also accepted)
    HOST, PORT            Listen address
";

/// Usage text for the server binary
pub fn help_text() -> String {
    format!("bus-tracker {}\n{}", env!("CARGO_PKG_VERSION"), USAGE)
}

/// Print usage for the server binary
pub fn print_help() {
    print!("{}", help_text());
}

#[cfg(test)]
mod tests {
    use super::*;

    // CMD_ARGS is process-global, so all assertions live in one test
    #[test]
    fn test_argument_helpers() {
        set_cmd_args(vec![
            "bus-tracker".to_string(),
            "--debug-relay".to_string(),
            "--config".to_string(),
            "conf/tracker.toml".to_string(),
            "--help".to_string(),
        ]);

        assert!(has_arg("--debug-relay"));
        assert!(!has_arg("--debug-upstream"));
        assert_eq!(get_config_path(), Some("conf/tracker.toml".to_string()));
        assert_eq!(get_arg_value("--port"), None);
        assert!(is_debug_relay_enabled());
        assert_eq!(get_enabled_debug_modes(), vec!["relay"]);
        assert!(patterns::is_help_requested());
        assert!(!patterns::is_version_requested());

        set_cmd_args(vec![
            "bus-tracker".to_string(),
            "--config".to_string(),
            "--quiet".to_string(),
        ]);
        assert_eq!(get_config_path(), None);
    }

    #[test]
    fn test_help_lists_every_flag() {
        let help = help_text();
        for mode in ["relay", "upstream", "webserver", "client"] {
            assert!(
                help.contains(&format!("--debug-{}", mode)),
                "missing --debug-{}",
                mode
            );
        }
        for flag in ["--log-tags", "--verbose", "--quiet", "--config"] {
            assert!(help.contains(flag), "missing {}", flag);
        }
    }
}
