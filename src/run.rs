/// Server lifecycle
///
/// Startup order: scan database, hub and poller, listener. Any failure before
/// the listener is bound is fatal. Shutdown runs in reverse on Ctrl-C.
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tokio::sync::{Mutex, Notify};

use crate::{
    config::Config,
    logger::{self, LogTag},
    poller::ScanPoller,
    reconciler::TokenReconciler,
    records::SqliteScanSource,
    webserver::{self, ws::WsHub, AppState},
};

/// Upper bound for a component to finish after being told to stop
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub async fn run_server(config: Config) -> Result<()> {
    logger::info(LogTag::System, "scanboard starting up...");

    // 1. Scan database (read-only); failure to open is fatal
    let source = Arc::new(
        SqliteScanSource::open(&config.database.path, &config.database.table)
            .context("Cannot start without the scan database")?,
    );

    // 2. Shared state
    let hub = WsHub::new(config.webserver.websocket.client_buffer_size);
    let reconciler = Arc::new(Mutex::new(TokenReconciler::new()));
    let poller = ScanPoller::new(
        source.clone(),
        reconciler.clone(),
        hub.clone(),
        config.poller.max_rows,
    );
    let state = Arc::new(AppState::new(
        config.webserver.clone(),
        config.poller.clone(),
        hub.clone(),
        reconciler,
        poller.stats(),
    ));

    // 3. Listener
    let listener = webserver::bind(&config.webserver.host, config.webserver.port)
        .await
        .context("Cannot start webserver")?;

    // 4. Background tasks
    let poller_shutdown = Arc::new(Notify::new());
    let server_shutdown = Arc::new(Notify::new());

    let poller_task = tokio::spawn(poller.run(
        Duration::from_millis(config.poller.interval_ms),
        poller_shutdown.clone(),
    ));
    let mut server_task = tokio::spawn(webserver::serve(listener, state, server_shutdown.clone()));

    logger::info(LogTag::System, "Ready - press Ctrl-C to stop");

    // 5. Wait for Ctrl-C (or the server dying on its own)
    let server_failure = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            if let Err(e) = signal {
                logger::error(LogTag::System, &format!("Failed to listen for Ctrl-C: {}", e));
            }
            logger::info(LogTag::System, "Shutdown requested");
            None
        }
        result = &mut server_task => Some(match result {
            Ok(Ok(())) => anyhow!("webserver stopped unexpectedly"),
            Ok(Err(e)) => anyhow!(e),
            Err(e) => anyhow!("webserver task failed: {}", e),
        }),
    };

    // 6. Stop the timer; a tick in flight finishes first
    poller_shutdown.notify_one();
    if tokio::time::timeout(SHUTDOWN_GRACE, poller_task).await.is_err() {
        logger::warning(LogTag::System, "Poller did not stop in time");
    }

    // 7. Close client channels, then the server
    hub.close_all().await;
    if server_failure.is_none() {
        server_shutdown.notify_one();
        match tokio::time::timeout(SHUTDOWN_GRACE, server_task).await {
            Ok(Ok(Err(e))) => logger::error(LogTag::System, &format!("Webserver error: {}", e)),
            Ok(_) => {}
            Err(_) => logger::warning(LogTag::System, "Webserver did not stop in time"),
        }
    }

    // 8. Data source
    source.close();

    match server_failure {
        Some(e) => Err(e),
        None => {
            logger::info(LogTag::System, "Shutdown complete");
            Ok(())
        }
    }
}
