/// Error types for scanboard
///
/// Each variant family maps to one failure domain:
/// - [`DataSourceError`]: opening or querying the scan records database
/// - [`RecordMappingError`]: a single row that cannot become a record
/// - [`ChannelError`]: a single client connection
/// - [`ConfigError`]: loading the configuration file
/// - [`ServerError`]: binding and running the HTTP/WebSocket server
use thiserror::Error;

// =============================================================================
// DATA SOURCE ERRORS
// =============================================================================

#[derive(Debug, Error)]
pub enum DataSourceError {
    /// Fatal at startup
    #[error("Failed to open scan database '{path}': {reason}")]
    Connect { path: String, reason: String },

    /// Recoverable: the current tick is skipped
    #[error("Scan query failed: {0}")]
    Query(String),
}

impl DataSourceError {
    pub fn connect(path: impl Into<String>, reason: impl ToString) -> Self {
        DataSourceError::Connect {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, DataSourceError::Connect { .. })
    }
}

impl From<rusqlite::Error> for DataSourceError {
    fn from(e: rusqlite::Error) -> Self {
        DataSourceError::Query(e.to_string())
    }
}

// =============================================================================
// RECORD MAPPING ERRORS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordMappingError {
    #[error("row has no token address")]
    MissingAddress,

    #[error("column '{column}' has unusable value: {reason}")]
    InvalidValue { column: String, reason: String },

    #[error("column '{column}' holds malformed JSON: {reason}")]
    InvalidJson { column: String, reason: String },
}

impl RecordMappingError {
    pub fn invalid(column: &str, reason: impl ToString) -> Self {
        RecordMappingError::InvalidValue {
            column: column.to_string(),
            reason: reason.to_string(),
        }
    }
}

// =============================================================================
// CHANNEL ERRORS
// =============================================================================

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Invalid client message: {0}")]
    InvalidMessage(String),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Send error: {0}")]
    Send(String),
}

// =============================================================================
// CONFIG ERRORS
// =============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config already initialized")]
    AlreadyInitialized,

    #[error("Invalid config field '{field}': {reason}")]
    Invalid { field: String, reason: String },
}

// =============================================================================
// SERVER ERRORS
// =============================================================================

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid bind address '{0}'")]
    InvalidAddress(String),

    #[error("Failed to bind to {addr}: {message}")]
    Bind { addr: String, message: String },

    #[error("Server error: {0}")]
    Serve(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_error_is_fatal() {
        let err = DataSourceError::connect("data/scan.db", "unable to open database file");
        assert!(err.is_fatal());
        assert!(err.to_string().contains("data/scan.db"));
    }

    #[test]
    fn test_query_error_is_recoverable() {
        let err: DataSourceError = rusqlite::Error::InvalidQuery.into();
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_mapping_error_display() {
        let err = RecordMappingError::invalid("decimals", "blob value");
        assert_eq!(
            err.to_string(),
            "column 'decimals' has unusable value: blob value"
        );
    }
}
