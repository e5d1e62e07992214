/// Logger configuration and per-tag filtering state
///
/// Populated from command-line flags by [`init_from_args`]:
/// - `--debug-<tag>` enables debug output for one tag
/// - `--verbose` enables verbose output for all tags
/// - `--verbose-<tag>` enables verbose output for one tag
/// - `--quiet` raises the threshold to warnings
use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::RwLock;

use super::levels::LogLevel;
use super::tags::LogTag;
use crate::arguments;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Messages above this level are dropped
    pub min_level: LogLevel,

    /// Tags with debug output enabled (debug keys)
    pub debug_tags: HashSet<String>,

    /// Tags with verbose output enabled (debug keys)
    pub verbose_tags: HashSet<String>,

    /// Write a plain-text copy of every line to disk
    pub file_enabled: bool,

    /// Directory for log files
    pub directory: PathBuf,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            debug_tags: HashSet::new(),
            verbose_tags: HashSet::new(),
            file_enabled: false,
            directory: PathBuf::from("logs"),
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

/// Snapshot of the current logger configuration
pub fn get_logger_config() -> LoggerConfig {
    match LOGGER_CONFIG.read() {
        Ok(cfg) => cfg.clone(),
        Err(poisoned) => poisoned.into_inner().clone(),
    }
}

/// Replace the logger configuration
pub fn set_logger_config(config: LoggerConfig) {
    match LOGGER_CONFIG.write() {
        Ok(mut cfg) => *cfg = config,
        Err(poisoned) => *poisoned.into_inner() = config,
    }
}

/// Apply debug/verbose/quiet flags from the process arguments
///
/// File settings already present in the configuration are preserved.
pub fn init_from_args() {
    let args = arguments::get_cmd_args();
    let mut config = get_logger_config();
    apply_args(&mut config, &args);
    set_logger_config(config);
}

fn apply_args(config: &mut LoggerConfig, args: &[String]) {
    for arg in args {
        if arg == "--verbose" {
            config.min_level = LogLevel::Verbose;
        } else if arg == "--quiet" {
            config.min_level = LogLevel::Warning;
        } else if let Some(tag) = arg.strip_prefix("--debug-") {
            config.debug_tags.insert(tag.to_lowercase());
            if config.min_level < LogLevel::Debug {
                config.min_level = LogLevel::Debug;
            }
        } else if let Some(tag) = arg.strip_prefix("--verbose-") {
            config.verbose_tags.insert(tag.to_lowercase());
            config.min_level = LogLevel::Verbose;
        }
    }
}

pub(super) fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    let config = get_logger_config();
    let key = tag.to_debug_key();
    config.debug_tags.contains(&key) || config.verbose_tags.contains(&key)
}

pub(super) fn is_verbose_enabled_for_tag(tag: &LogTag) -> bool {
    get_logger_config()
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
    fn test_debug_flag_enables_tag() {
        let mut config = LoggerConfig::default();
        apply_args(&mut config, &args(&["scanboard", "--debug-poller"]));

        assert!(config.debug_tags.contains("poller"));
        assert_eq!(config.min_level, LogLevel::Debug);
    }

    #[test]
    fn test_quiet_raises_threshold() {
        let mut config = LoggerConfig::default();
        apply_args(&mut config, &args(&["scanboard", "--quiet"]));

        assert_eq!(config.min_level, LogLevel::Warning);
        assert!(config.debug_tags.is_empty());
    }

    #[test]
    fn test_verbose_tag() {
        let mut config = LoggerConfig::default();
        apply_args(&mut config, &args(&["scanboard", "--verbose-database"]));

        assert!(config.verbose_tags.contains("database"));
        assert_eq!(config.min_level, LogLevel::Verbose);
    }
}
