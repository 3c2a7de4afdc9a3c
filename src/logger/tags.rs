/// Log tags identify the subsystem a message comes from.
///
/// Each tag maps to a `--debug-<key>` / `--verbose-<key>` command-line flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Config,
    Webserver,
    Relay,
    Upstream,
    Client,
}

impl LogTag {
    /// Uppercase label used in console and file output
    pub fn to_plain_string(&self) -> String {
        match self {
            LogTag::System => "SYSTEM".to_string(),
            LogTag::Config => "CONFIG".to_string(),
            LogTag::Webserver => "WEBSERVER".to_string(),
            LogTag::Relay => "RELAY".to_string(),
            LogTag::Upstream => "UPSTREAM".to_string(),
            LogTag::Client => "CLIENT".to_string(),
        }
    }

    /// Key used by `--debug-<key>` flags
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::System => "system".to_string(),
            LogTag::Config => "config".to_string(),
            LogTag::Webserver => "webserver".to_string(),
            LogTag::Relay => "relay".to_string(),
            LogTag::Upstream => "upstream".to_string(),
            LogTag::Client => "client".to_string(),
        }
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_plain_string())
    }
}
