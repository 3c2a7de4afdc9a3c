/// Logger configuration derived from command-line flags
///
/// Recognised flags:
/// - `--debug-<tag>`   enable DEBUG output for one tag (e.g. `--debug-relay`)
/// - `--verbose`       enable VERBOSE output for every tag
/// - `--verbose-<tag>` enable VERBOSE output for one tag
/// - `--quiet`         only errors
/// - `--log-tags a,b`  restrict INFO/WARNING output to the listed tags
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashSet;

use super::levels::LogLevel;
use super::tags::LogTag;
use crate::arguments;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Highest level that may be printed
    pub min_level: LogLevel,

    /// Tags with DEBUG output enabled
    pub debug_tags: HashSet<String>,

    /// Tags with VERBOSE output enabled
    pub verbose_tags: HashSet<String>,

    /// When non-empty, only these tags are printed below ERROR
    pub enabled_tags: HashSet<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            debug_tags: HashSet::new(),
            verbose_tags: HashSet::new(),
            enabled_tags: HashSet::new(),
        }
    }
}

impl LoggerConfig {
    /// Build a configuration from an argument list
    pub fn from_args(args: &[String]) -> Self {
        let mut config = LoggerConfig::default();

        for (i, arg) in args.iter().enumerate() {
            if arg == "--quiet" {
                config.min_level = LogLevel::Error;
            } else if arg == "--verbose" {
                config.min_level = LogLevel::Verbose;
            } else if let Some(tag) = arg.strip_prefix("--verbose-") {
                config.verbose_tags.insert(tag.to_lowercase());
                config.debug_tags.insert(tag.to_lowercase());
            } else if let Some(tag) = arg.strip_prefix("--debug-") {
                config.debug_tags.insert(tag.to_lowercase());
            } else if arg == "--log-tags" {
                if let Some(value) = args.get(i + 1) {
                    config.enabled_tags = value
                        .split(',')
                        .map(|t| t.trim().to_lowercase())
                        .filter(|t| !t.is_empty())
                        .collect();
                }
            }
        }

        // Any per-tag debug flag raises the threshold so DEBUG lines pass the level check
        if config.min_level != LogLevel::Error
            && config.min_level < LogLevel::Debug
            && !config.debug_tags.is_empty()
        {
            config.min_level = LogLevel::Debug;
        }
        if config.min_level != LogLevel::Error && !config.verbose_tags.is_empty() {
            config.min_level = LogLevel::Verbose;
        }

        config
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

/// Initialize logger configuration from the process arguments
pub fn init_from_args() {
    let config = LoggerConfig::from_args(&arguments::get_cmd_args());
    set_logger_config(config);
}

pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG.read().clone()
}

pub fn set_logger_config(config: LoggerConfig) {
    *LOGGER_CONFIG.write() = config;
}

/// Modify the active configuration in place
pub fn update_logger_config<F: FnOnce(&mut LoggerConfig)>(update: F) {
    let mut config = LOGGER_CONFIG.write();
    update(&mut config);
}

pub fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    let config = LOGGER_CONFIG.read();
    (config.min_level == LogLevel::Verbose && config.verbose_tags.is_empty())
        || config.debug_tags.contains(&tag.to_debug_key())
}

pub fn is_verbose_enabled_for_tag(tag: &LogTag) -> bool {
    LOGGER_CONFIG
        .read()
        .verbose_tags
        .contains(&tag.to_debug_key())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_debug_flags_enable_tags() {
        let config = LoggerConfig::from_args(&args(&["bus-tracker", "--debug-relay"]));
        assert!(config.debug_tags.contains("relay"));
        assert_eq!(config.min_level, LogLevel::Debug);
    }

    #[test]
    fn test_quiet_wins_over_debug() {
        let config =
            LoggerConfig::from_args(&args(&["bus-tracker", "--quiet", "--debug-upstream"]));
        assert_eq!(config.min_level, LogLevel::Error);
    }

    #[test]
    fn test_log_tags_filter() {
        let config =
            LoggerConfig::from_args(&args(&["bus-tracker", "--log-tags", "relay, Webserver"]));
        assert!(config.enabled_tags.contains("relay"));
        assert!(config.enabled_tags.contains("webserver"));
        assert_eq!(config.enabled_tags.len(), 2);
    }
}
