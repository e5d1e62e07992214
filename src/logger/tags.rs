/// Log tags identify which subsystem produced a message.
///
/// Each tag maps to a `--debug-<key>` / `--verbose-<key>` flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogTag {
    System,
    Config,
    Database,
    Poller,
    Webserver,
    Client,
}

impl LogTag {
    /// Key used in debug flags (lowercase)
    pub fn to_debug_key(&self) -> String {
        match self {
            LogTag::System => "system".to_string(),
            LogTag::Config => "config".to_string(),
            LogTag::Database => "database".to_string(),
            LogTag::Poller => "poller".to_string(),
            LogTag::Webserver => "webserver".to_string(),
            LogTag::Client => "client".to_string(),
        }
    }

    /// Uncolored label used in log files
    pub fn to_plain_string(&self) -> String {
        match self {
            LogTag::System => "SYSTEM".to_string(),
            LogTag::Config => "CONFIG".to_string(),
            LogTag::Database => "DATABASE".to_string(),
            LogTag::Poller => "POLLER".to_string(),
            LogTag::Webserver => "WEBSERVER".to_string(),
            LogTag::Client => "CLIENT".to_string(),
        }
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_plain_string())
    }
}
