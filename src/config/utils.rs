/// Configuration utilities - loading, overrides, validation and access helpers
use super::schemas::Config;
use crate::arguments;
use crate::errors::ConfigError;
use crate::logger::{self, LogTag};
use once_cell::sync::OnceCell;
use std::path::Path;
use std::sync::RwLock;

/// Global configuration instance
///
/// Access it using [`with_config`].
pub static CONFIG: OnceCell<RwLock<Config>> = OnceCell::new();

/// Default configuration file path
pub const CONFIG_FILE_PATH: &str = "data/config.toml";

/// Load configuration (file + CLI overrides), validate it and install it globally
///
/// The file path comes from `--config` or [`CONFIG_FILE_PATH`].
pub fn load_config() -> Result<Config, ConfigError> {
    let path = arguments::get_config_path_override().unwrap_or_else(|| CONFIG_FILE_PATH.to_string());

    let mut config = load_config_from_path(&path)?;
    apply_cli_overrides(&mut config)?;
    validate_config(&config)?;

    CONFIG
        .set(RwLock::new(config.clone()))
        .map_err(|_| ConfigError::AlreadyInitialized)?;

    Ok(config)
}

/// Load configuration from a specific file path
///
/// A missing file is not an error: defaults from the schema are used.
pub fn load_config_from_path(path: &str) -> Result<Config, ConfigError> {
    if !Path::new(path).exists() {
        logger::warning(
            LogTag::Config,
            &format!("Config file '{}' not found, using default values", path),
        );
        return Ok(Config::default());
    }

    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_string(),
        source,
    })?;

    let config = parse_config(path, &contents)?;
    logger::debug(LogTag::Config, &format!("Loaded config from {}", path));
    Ok(config)
}

fn parse_config(path: &str, contents: &str) -> Result<Config, ConfigError> {
    toml::from_str::<Config>(contents).map_err(|source| ConfigError::Parse {
        path: path.to_string(),
        source,
    })
}

/// Apply `--db`, `--host` and `--port` on top of the file values
pub fn apply_cli_overrides(config: &mut Config) -> Result<(), ConfigError> {
    if let Some(db) = arguments::get_db_path_override() {
        logger::info(LogTag::Config, &format!("CLI override: database {}", db));
        config.database.path = db;
    }

    if let Some(host) = arguments::get_host_override() {
        logger::info(LogTag::Config, &format!("CLI override: host {}", host));
        if host == "0.0.0.0" {
            logger::warning(
                LogTag::Config,
                "Binding to 0.0.0.0 allows remote access - ensure firewall is configured",
            );
        }
        config.webserver.host = host;
    }

    let port = arguments::get_port_override().map_err(|reason| ConfigError::Invalid {
        field: "webserver.port".to_string(),
        reason,
    })?;
    if let Some(port) = port {
        logger::info(LogTag::Config, &format!("CLI override: port {}", port));
        config.webserver.port = port;
    }

    Ok(())
}

/// Reject values that would make the server misbehave
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let invalid = |field: &str, reason: &str| ConfigError::Invalid {
        field: field.to_string(),
        reason: reason.to_string(),
    };

    if config.poller.interval_ms == 0 {
        return Err(invalid("poller.interval_ms", "must be greater than 0"));
    }
    if config.poller.max_rows == 0 {
        return Err(invalid("poller.max_rows", "must be greater than 0"));
    }
    if config.webserver.websocket.client_buffer_size == 0 {
        return Err(invalid(
            "webserver.websocket.client_buffer_size",
            "must be greater than 0",
        ));
    }
    if config.webserver.websocket.heartbeat_secs >= config.webserver.websocket.client_idle_timeout_secs
    {
        return Err(invalid(
            "webserver.websocket.heartbeat_secs",
            "must be lower than client_idle_timeout_secs",
        ));
    }
    if config.database.table.is_empty()
        || !config
            .database
            .table
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(invalid(
            "database.table",
            "must be a plain identifier (letters, digits, underscore)",
        ));
    }

    Ok(())
}

/// Execute a function with read access to the configuration
///
/// Falls back to defaults when [`load_config`] has not run (tests, tools).
pub fn with_config<F, R>(f: F) -> R
where
    F: FnOnce(&Config) -> R,
{
    match CONFIG.get() {
        Some(lock) => match lock.read() {
            Ok(config) => f(&config),
            Err(poisoned) => f(&poisoned.into_inner()),
        },
        None => f(&Config::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = parse_config(
            "test.toml",
            r#"
            [poller]
            interval_ms = 500

            [webserver]
            port = 4000
            "#,
        )
        .unwrap();

        assert_eq!(config.poller.interval_ms, 500);
        assert_eq!(config.poller.max_rows, 100);
        assert_eq!(config.webserver.port, 4000);
        assert_eq!(config.webserver.host, "127.0.0.1");
        assert_eq!(config.database.table, "scan_records");
        assert_eq!(config.webserver.websocket.heartbeat_secs, 30);
    }

    #[test]
    fn test_parse_error_reports_path() {
        let err = parse_config("broken.toml", "[poller\ninterval_ms = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[database]\npath = \"/var/scans/records.db\"").unwrap();

        let config = load_config_from_path(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.database.path, "/var/scans/records.db");
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let config = load_config_from_path("/nonexistent/scanboard/config.toml").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_validate_rejects_zero_interval() {
        let mut config = Config::default();
        config.poller.interval_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_rejects_table_injection() {
        let mut config = Config::default();
        config.database.table = "scan_records; DROP TABLE x".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_with_config_falls_back_to_defaults() {
        // Tests never install the global config
        assert_eq!(with_config(|cfg| cfg.poller.interval_ms), 2000);
        assert_eq!(with_config(|cfg| cfg.database.table.clone()), "scan_records");
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }
}
