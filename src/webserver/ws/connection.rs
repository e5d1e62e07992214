/// WebSocket connection handler
///
/// Manages individual WebSocket connections with:
/// - Client requests (`PING`, `get_tokens`)
/// - Frame forwarding from hub to client
/// - Health monitoring and heartbeat
/// - Close when the hub drops the queue (shutdown)
use axum::extract::ws::{Message, WebSocket};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{
    arguments::is_debug_webserver_enabled,
    errors::ChannelError,
    logger::{self, LogTag},
    reconciler::TokenReconciler,
};

use super::{
    health::{ConnectionHealth, HealthConfig},
    hub::{ConnectionId, Frame, WsHub},
    message::{ClientMessage, ServerMessage},
};

type WsSink = SplitSink<WebSocket, Message>;

/// Handle a WebSocket connection until either side closes it
pub async fn handle_connection(
    socket: WebSocket,
    hub: Arc<WsHub>,
    reconciler: Arc<Mutex<TokenReconciler>>,
    health_config: HealthConfig,
) {
    let (conn_id, mut hub_rx) = hub.register_connection().await;
    let (mut ws_tx, mut ws_rx) = socket.split();

    let mut health_tick = tokio::time::interval(health_config.check_interval());
    health_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut health = ConnectionHealth::new(health_config);

    if is_debug_webserver_enabled() {
        logger::debug(
            LogTag::Webserver,
            &format!("Connection {} started", conn_id),
        );
    }

    loop {
        tokio::select! {
            biased;

            // Frames from hub (broadcast to client)
            frame = hub_rx.recv() => {
                match frame {
                    Some(frame) => {
                        if let Err(e) = forward_to_client(&mut ws_tx, frame).await {
                            logger::warning(
                                LogTag::Webserver,
                                &format!("Connection {}: failed to send message: {}", conn_id, e),
                            );
                            break;
                        }
                    }
                    None => {
                        // Hub closed our queue: server is shutting down
                        let _ = ws_tx.send(Message::Close(None)).await;
                        break;
                    }
                }
            }

            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        health.record_activity();

                        if let Err(e) = handle_client_message(&text, &mut ws_tx, conn_id, &reconciler).await {
                            logger::warning(
                                LogTag::Webserver,
                                &format!("Connection {}: {}", conn_id, e),
                            );
                            break;
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        health.record_activity();
                        let reply = ServerMessage::error("binary frames are not supported");
                        if send_message(&mut ws_tx, &reply).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                        health.record_activity();
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        if is_debug_webserver_enabled() {
                            logger::debug(
                                LogTag::Webserver,
                                &format!("Connection {}: client closed", conn_id),
                            );
                        }
                        break;
                    }
                    Some(Err(e)) => {
                        logger::warning(
                            LogTag::Webserver,
                            &format!("Connection {}: websocket error: {}", conn_id, e),
                        );
                        break;
                    }
                }
            }

            _ = health_tick.tick() => {
                if health.is_idle() {
                    logger::warning(
                        LogTag::Webserver,
                        &format!(
                            "Connection {}: idle timeout ({}s)",
                            conn_id,
                            health.seconds_since_activity()
                        ),
                    );
                    break;
                }

                if health.is_pong_overdue() {
                    logger::warning(
                        LogTag::Webserver,
                        &format!("Connection {}: pong timeout", conn_id),
                    );
                    break;
                }

                if health.needs_ping() {
                    if is_debug_webserver_enabled() {
                        logger::debug(
                            LogTag::Webserver,
                            &format!("Connection {}: sending ping", conn_id),
                        );
                    }
                    if ws_tx.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                    health.record_ping();
                }
            }
        }
    }

    hub.unregister_connection(conn_id).await;

    if is_debug_webserver_enabled() {
        logger::debug(
            LogTag::Webserver,
            &format!("Connection {} closed", conn_id),
        );
    }
}

async fn forward_to_client(ws_tx: &mut WsSink, frame: Frame) -> Result<(), ChannelError> {
    ws_tx
        .send(Message::Text(frame.to_string()))
        .await
        .map_err(|e| ChannelError::Send(e.to_string()))
}

/// Answer one client text frame
///
/// A frame that does not parse gets an `error` reply; only a failed send
/// ends the connection.
async fn handle_client_message(
    text: &str,
    ws_tx: &mut WsSink,
    conn_id: ConnectionId,
    reconciler: &Arc<Mutex<TokenReconciler>>,
) -> Result<(), ChannelError> {
    let reply = match ClientMessage::parse(text) {
        Ok(ClientMessage::Ping) => ServerMessage::pong_now(),
        Ok(ClientMessage::GetTokens) => {
            let tokens = reconciler.lock().await.full_list();
            if is_debug_webserver_enabled() {
                logger::debug(
                    LogTag::Webserver,
                    &format!("Connection {}: get_tokens ({} records)", conn_id, tokens.len()),
                );
            }
            ServerMessage::TokenList(tokens)
        }
        Err(e) => {
            logger::warning(
                LogTag::Webserver,
                &format!("Connection {}: rejected frame: {}", conn_id, e),
            );
            ServerMessage::error(e.to_string())
        }
    };

    send_message(ws_tx, &reply).await
}

async fn send_message(ws_tx: &mut WsSink, msg: &ServerMessage) -> Result<(), ChannelError> {
    let json = msg.to_json()?;
    ws_tx
        .send(Message::Text(json))
        .await
        .map_err(|e| ChannelError::Send(e.to_string()))
}
