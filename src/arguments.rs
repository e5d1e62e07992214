/// Centralized argument handling for scanboard
///
/// Arguments are captured once and shared with the logger (debug flags) and
/// the configuration loader (overrides).
///
/// Features:
/// - Centralized CMD_ARGS storage, captured on first access
/// - Debug flag checking functions per module
/// - Override accessors for config path, database path, host and port
use once_cell::sync::Lazy;
use std::env;

/// Global command-line arguments storage
pub static CMD_ARGS: Lazy<Vec<String>> = Lazy::new(|| env::args().collect());

/// Gets a copy of the command-line arguments
pub fn get_cmd_args() -> Vec<String> {
    CMD_ARGS.clone()
}

/// Checks if a specific argument is present in the command line
pub fn has_arg(arg: &str) -> bool {
    get_cmd_args().iter().any(|a| a == arg)
}

/// Gets the value of a command-line argument that follows a flag
pub fn get_arg_value(flag: &str) -> Option<String> {
    value_after(&get_cmd_args(), flag)
}

fn value_after(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .filter(|v| !v.starts_with("--"))
        .cloned()
}

// =============================================================================
// DEBUG FLAGS
// =============================================================================

/// Webserver / WebSocket hub debug mode
pub fn is_debug_webserver_enabled() -> bool {
    has_arg("--debug-webserver")
}

/// Reconciliation loop debug mode
pub fn is_debug_poller_enabled() -> bool {
    has_arg("--debug-poller")
}

// =============================================================================
// OVERRIDES
// =============================================================================

/// `--config <path>`
pub fn get_config_path_override() -> Option<String> {
    get_arg_value("--config")
}

/// `--db <path>`
pub fn get_db_path_override() -> Option<String> {
    get_arg_value("--db")
}

/// `--host <ip>`
pub fn get_host_override() -> Option<String> {
    get_arg_value("--host")
}

/// `--port <n>`; returns an error for values that are not a valid port
pub fn get_port_override() -> Result<Option<u16>, String> {
    match get_arg_value("--port") {
        None => Ok(None),
        Some(raw) => parse_port(&raw).map(Some),
    }
}

fn parse_port(raw: &str) -> Result<u16, String> {
    match raw.parse::<u16>() {
        Ok(0) => Err("Port 0 is not allowed".to_string()),
        Ok(port) => Ok(port),
        Err(_) => Err(format!("Invalid port '{}': expected 1-65535", raw)),
    }
}

/// `--help` / `-h`
pub fn is_help_requested() -> bool {
    has_arg("--help") || has_arg("-h")
}

// =============================================================================
// HELP SYSTEM
// =============================================================================

/// Displays the help menu with all available flags and their descriptions
pub fn print_help() {
    println!("scanboard - real-time token scan dashboard server");
    println!();
    println!("USAGE:");
    println!("    scanboard [FLAGS]");
    println!();
    println!("OPTIONS:");
    println!("    --config <path>           Config file (default data/config.toml)");
    println!("    --db <path>               Scan records database (overrides config)");
    println!("    --host <ip>               Bind address (overrides config)");
    println!("    --port <n>                Bind port (overrides config)");
    println!("    --help, -h                Show this help message");
    println!();
    println!("LOGGING FLAGS:");
    println!("    --quiet                   Only warnings and errors");
    println!("    --verbose                 Everything, including verbose traces");
    println!("    --debug-database          Database access debug mode");
    println!("    --debug-poller            Reconciliation loop debug mode");
    println!("    --debug-webserver         Webserver and WebSocket debug mode");
    println!("    --debug-config            Configuration loading debug mode");
}
