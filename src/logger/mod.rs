//! Structured logging for the tracker
//!
//! - Standard levels (Error/Warning/Info/Debug/Verbose)
//! - Per-subsystem debug control via `--debug-<tag>` flags
//! - Colored console output, optionally mirrored to a log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bus_tracker::logger::{self, LogTag};
//!
//! logger::init();
//! logger::info(LogTag::Relay, "Feed started for bus-12");
//! logger::debug(LogTag::Upstream, "GET /data?device_id=bus-12"); // only with --debug-upstream
//! ```

mod config;
mod core;
mod file;
mod format;
mod levels;
mod tags;

pub use config::{
    get_logger_config, init_from_args, set_logger_config, update_logger_config, LoggerConfig,
};
pub use levels::LogLevel;
pub use tags::LogTag;

/// Initialize the logger from command-line flags
///
/// Call once at startup, before anything logs.
pub fn init() {
    config::init_from_args();
}

/// Mirror all further log lines into `path`
pub fn enable_file_logging(path: &std::path::Path) -> Result<(), String> {
    file::init_file_logging(path)
}

/// Log at ERROR level (always shown)
pub fn error(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level
pub fn warning(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level
pub fn info(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level (only shown with `--debug-<tag>`)
pub fn debug(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Debug, message);
}

/// Log at VERBOSE level (only shown with `--verbose` / `--verbose-<tag>`)
pub fn verbose(tag: LogTag, message: &str) {
    core::log_internal(tag, LogLevel::Verbose, message);
}

/// Check whether DEBUG output is active for a tag, to skip building expensive messages
pub fn is_debug_enabled(tag: &LogTag) -> bool {
    core::should_log(tag, LogLevel::Debug)
}

/// Flush pending file writes (call during shutdown)
pub fn flush() {
    file::flush_file_logging();
}
