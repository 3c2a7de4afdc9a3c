use bus_tracker::{
    arguments::{get_enabled_debug_modes, patterns, print_help},
    config,
    logger::{self, LogTag},
    webserver,
};
use std::path::Path;
use std::sync::Arc;

/// Main entry point for the tracker relay server
///
/// - `--help` / `--version` print and exit
/// - otherwise loads configuration and serves until Ctrl+C
#[tokio::main]
async fn main() {
    logger::init();

    if patterns::is_help_requested() {
        print_help();
        std::process::exit(0);
    }
    if patterns::is_version_requested() {
        println!("bus-tracker {}", env!("CARGO_PKG_VERSION"));
        std::process::exit(0);
    }

    logger::info(
        LogTag::System,
        &format!("bus-tracker {} starting up...", env!("CARGO_PKG_VERSION")),
    );

    let debug_modes = get_enabled_debug_modes();
    if !debug_modes.is_empty() {
        logger::info(
            LogTag::System,
            &format!("Debug modes enabled: {}", debug_modes.join(", ")),
        );
    }

    let config = match config::load_config() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            logger::error(
                LogTag::Config,
                &format!("Failed to load configuration: {}", e),
            );
            std::process::exit(1);
        }
    };

    if !config.logging.file.is_empty() {
        if let Err(e) = logger::enable_file_logging(Path::new(&config.logging.file)) {
            logger::warning(LogTag::System, &format!("File logging disabled: {}", e));
        }
    }

    if config.upstream.token.is_empty() {
        logger::warning(
            LogTag::Config,
            "No upstream token configured (BUS_API_TOKEN); requests are sent unauthenticated",
        );
    }

    let exit_code = match webserver::start_server(config).await {
        Ok(()) => 0,
        Err(e) => {
            logger::error(LogTag::Webserver, &format!("Webserver failed: {}", e));
            1
        }
    };

    logger::info(LogTag::System, "Shutdown complete");
    logger::flush();
    std::process::exit(exit_code);
}
