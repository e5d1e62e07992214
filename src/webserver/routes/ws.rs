/// WebSocket endpoint
use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::Response,
    routing::get,
    Router,
};
use std::sync::Arc;

use crate::{
    arguments::is_debug_webserver_enabled,
    logger::{self, LogTag},
    webserver::{state::AppState, ws::connection::handle_connection},
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/ws", get(ws_hub_handler))
}

/// GET /ws
pub async fn ws_hub_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    if is_debug_webserver_enabled() {
        logger::debug(
            LogTag::Webserver,
            &format!(
                "WebSocket upgrade requested (active={})",
                state.hub.active_connections().await
            ),
        );
    }

    let hub = state.hub.clone();
    let reconciler = state.reconciler.clone();
    let health = state.health_config();
    ws.on_upgrade(move |socket| handle_connection(socket, hub, reconciler, health))
}
