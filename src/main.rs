use std::path::PathBuf;

use scanboard::{
    arguments::{is_help_requested, print_help},
    config,
    logger::{self, LogTag},
};

/// Main entry point for scanboard
///
/// Loads configuration, wires logging, then runs the server until Ctrl-C.
/// Exits 1 on any startup failure.
#[tokio::main]
async fn main() {
    if is_help_requested() {
        print_help();
        std::process::exit(0);
    }

    let config = match config::load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // File output follows the config; level and tag flags come from the command line
    let mut logger_config = logger::get_logger_config();
    logger_config.file_enabled = config.logging.file_enabled;
    logger_config.directory = PathBuf::from(&config.logging.directory);
    logger::set_logger_config(logger_config);
    logger::init();

    logger::info(
        LogTag::Config,
        &format!(
            "Database {} (table '{}'), poll every {}ms, listening on {}:{}",
            config.database.path,
            config.database.table,
            config.poller.interval_ms,
            config.webserver.host,
            config.webserver.port
        ),
    );

    let exit_code = match scanboard::run::run_server(config).await {
        Ok(()) => 0,
        Err(e) => {
            logger::error(LogTag::System, &format!("{:#}", e));
            1
        }
    };

    logger::flush();
    std::process::exit(exit_code);
}
