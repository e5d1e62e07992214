use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

use crate::{
    arguments::is_debug_webserver_enabled,
    logger::{self, LogTag},
    poller::PollerStatsSnapshot,
    webserver::{state::AppState, ws::metrics::HubMetricsSnapshot},
};

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub status: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub version: String,
    pub uptime_seconds: u64,
    pub active_connections: usize,
    pub record_count: usize,
    pub poll_interval_ms: u64,
    pub poller: PollerStatsSnapshot,
    pub hub: HubMetricsSnapshot,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/status", get(system_status))
}

/// GET /api/status
async fn system_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let response = StatusResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        active_connections: state.hub.active_connections().await,
        record_count: state.reconciler.lock().await.len(),
        poll_interval_ms: state.poller_config.interval_ms,
        poller: state.poller_stats.snapshot(),
        hub: state.hub.metrics().snapshot(),
    };

    if is_debug_webserver_enabled() {
        logger::debug(
            LogTag::Webserver,
            &format!(
                "Status requested (uptime={}s, connections={}, records={})",
                response.uptime_seconds, response.active_connections, response.record_count
            ),
        );
    }

    Json(response)
}
