/// Shared application state for the webserver
///
/// Handles to the long-lived components that route handlers need.
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::{PollerConfig, WebserverConfig};
use crate::poller::PollerStats;
use crate::reconciler::TokenReconciler;
use crate::webserver::ws::{health::HealthConfig, WsHub};

/// Shared application state passed to all route handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<WebserverConfig>,

    /// Reported on the status endpoint
    pub poller_config: PollerConfig,

    /// Central WebSocket hub
    pub hub: Arc<WsHub>,

    /// Token collection shared with the poller
    pub reconciler: Arc<Mutex<TokenReconciler>>,

    pub poller_stats: Arc<PollerStats>,

    /// Server startup time
    pub startup_time: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(
        config: WebserverConfig,
        poller_config: PollerConfig,
        hub: Arc<WsHub>,
        reconciler: Arc<Mutex<TokenReconciler>>,
        poller_stats: Arc<PollerStats>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            poller_config,
            hub,
            reconciler,
            poller_stats,
            startup_time: chrono::Utc::now(),
        }
    }

    pub fn health_config(&self) -> HealthConfig {
        HealthConfig::from_config(&self.config.websocket)
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        (chrono::Utc::now() - self.startup_time)
            .num_seconds()
            .max(0) as u64
    }
}
