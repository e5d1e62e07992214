// Configuration schemas

use crate::config_struct;

// ============================================================================
// DATABASE
// ============================================================================

config_struct! {
    /// Scan records database (read-only)
    pub struct DatabaseConfig {
        /// Path to the SQLite file written by the scanner
        path: String = "data/SCAN_RECORDS.db".to_string(),

        /// Table holding one row per scanned token
        table: String = "scan_records".to_string(),
    }
}

// ============================================================================
// POLLER
// ============================================================================

config_struct! {
    /// Reconciliation loop settings
    pub struct PollerConfig {
        /// Delay between ticks
        interval_ms: u64 = 2000,

        /// Row cap per snapshot (most recently scanned first)
        max_rows: usize = 100,
    }
}

// ============================================================================
// WEBSERVER
// ============================================================================

config_struct! {
    /// WebSocket connection tuning
    pub struct WebSocketConfig {
        /// Per-client outbound queue capacity; overflow drops messages for that client
        client_buffer_size: usize = 256,

        /// Silence before the server sends a WebSocket ping
        heartbeat_secs: u64 = 30,

        /// No client activity for this long closes the connection
        client_idle_timeout_secs: u64 = 90,
    }
}

config_struct! {
    /// HTTP / WebSocket server
    pub struct WebserverConfig {
        /// Host/IP address to bind
        host: String = "127.0.0.1".to_string(),

        /// Port to bind
        port: u16 = 3003,

        /// Browser origins allowed by CORS
        allowed_origins: Vec<String> = vec![
            "http://localhost:3000".to_string(),
            "http://localhost:3001".to_string(),
        ],

        websocket: WebSocketConfig = WebSocketConfig::default(),
    }
}

// ============================================================================
// LOGGING
// ============================================================================

config_struct! {
    pub struct LoggingConfig {
        /// Directory for daily log files
        directory: String = "logs".to_string(),

        /// Mirror console output into the log file
        file_enabled: bool = true,
    }
}

// ============================================================================
// ROOT CONFIGURATION
// ============================================================================

config_struct! {
    /// Root configuration structure containing all sub-configurations
    pub struct Config {
        database: DatabaseConfig = DatabaseConfig::default(),
        poller: PollerConfig = PollerConfig::default(),
        webserver: WebserverConfig = WebserverConfig::default(),
        logging: LoggingConfig = LoggingConfig::default(),
    }
}
