/// Central WebSocket hub - connection registry and broadcaster
///
/// The WsHub manages:
/// - Per-connection frame queues with backpressure (bounded, `try_send`)
/// - Broadcast fan-out of one pre-serialized frame to every connection
/// - Hub-level metrics
///
/// A slow client never blocks the broadcaster. When its queue is full the
/// frame is dropped and the client is evicted: its queue ends, the connection
/// closes, and the client has to reconnect and request the full list again.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use crate::{
    arguments::is_debug_webserver_enabled,
    logger::{self, LogTag},
};

use super::message::ServerMessage;
use super::metrics::HubMetrics;

// ============================================================================
// HUB TYPES
// ============================================================================

/// Connection ID (unique per WebSocket connection)
pub type ConnectionId = u64;

/// Serialized JSON text frame, shared across queues
pub type Frame = Arc<str>;

/// Per-connection sender (bounded channel)
pub type ConnectionSender = mpsc::Sender<Frame>;

/// Outcome of one broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: usize,
    pub dropped: usize,
}

// ============================================================================
// WS HUB
// ============================================================================

pub struct WsHub {
    /// Active connections (connection_id → sender)
    connections: RwLock<HashMap<ConnectionId, ConnectionSender>>,

    next_conn_id: AtomicU64,

    metrics: Arc<HubMetrics>,

    /// Per-client buffer size (from config)
    buffer_size: usize,
}

impl WsHub {
    pub fn new(buffer_size: usize) -> Arc<Self> {
        Arc::new(Self {
            connections: RwLock::new(HashMap::new()),
            next_conn_id: AtomicU64::new(1),
            metrics: HubMetrics::new(),
            buffer_size: buffer_size.max(1),
        })
    }

    /// Register a new connection
    pub async fn register_connection(&self) -> (ConnectionId, mpsc::Receiver<Frame>) {
        let conn_id = self.next_conn_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(self.buffer_size);

        let active = {
            let mut connections = self.connections.write().await;
            connections.insert(conn_id, tx);
            connections.len()
        };
        self.metrics.connection_opened();

        if is_debug_webserver_enabled() {
            logger::debug(
                LogTag::Webserver,
                &format!(
                    "WsHub: connection {} registered (active={})",
                    conn_id, active
                ),
            );
        }

        (conn_id, rx)
    }

    /// Unregister a connection; unknown IDs (already closed by the hub) are ignored
    pub async fn unregister_connection(&self, conn_id: ConnectionId) {
        let (removed, active) = {
            let mut connections = self.connections.write().await;
            let removed = connections.remove(&conn_id).is_some();
            (removed, connections.len())
        };

        if !removed {
            return;
        }
        self.metrics.connection_closed();

        if is_debug_webserver_enabled() {
            logger::debug(
                LogTag::Webserver,
                &format!(
                    "WsHub: connection {} unregistered (active={})",
                    conn_id, active
                ),
            );
        }
    }

    /// Serialize once and broadcast to all connections
    pub async fn broadcast(&self, message: &ServerMessage) -> BroadcastReport {
        match message.to_frame() {
            Ok(frame) => self.broadcast_frame(message.event_name(), frame).await,
            Err(e) => {
                self.metrics.serialize_failed();
                logger::error(
                    LogTag::Webserver,
                    &format!("Failed to serialize {}: {}", message.event_name(), e),
                );
                BroadcastReport::default()
            }
        }
    }

    /// Broadcast an already serialized frame to all connections
    pub async fn broadcast_frame(&self, event: &str, frame: Frame) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let mut lagging = Vec::new();

        {
            let connections = self.connections.read().await;
            for (conn_id, sender) in connections.iter() {
                match sender.try_send(Arc::clone(&frame)) {
                    Ok(_) => {
                        report.sent += 1;
                        self.metrics.message_sent();
                    }
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        report.dropped += 1;
                        self.metrics.message_dropped(1);
                        lagging.push(*conn_id);
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => {
                        // Connection is shutting down and will unregister itself
                    }
                }
            }
        }

        if !lagging.is_empty() {
            self.evict(&lagging, event).await;
        }

        if is_debug_webserver_enabled() {
            logger::debug(
                LogTag::Webserver,
                &format!(
                    "WsHub: broadcast {} (sent={}, dropped={})",
                    event, report.sent, report.dropped
                ),
            );
        }

        report
    }

    /// Drop the queues of clients that missed a frame
    async fn evict(&self, conn_ids: &[ConnectionId], event: &str) {
        let mut connections = self.connections.write().await;
        for conn_id in conn_ids {
            if connections.remove(conn_id).is_some() {
                self.metrics.connection_closed();
                self.metrics.connection_evicted();
                logger::warning(
                    LogTag::Webserver,
                    &format!(
                        "WsHub: connection {} missed {} (queue full), closing it so the client resyncs",
                        conn_id, event
                    ),
                );
            }
        }
    }

    /// Drop every connection queue; each connection sees its queue end and closes
    pub async fn close_all(&self) -> usize {
        let closed: Vec<ConnectionId> = {
            let mut connections = self.connections.write().await;
            connections.drain().map(|(id, _)| id).collect()
        };

        for _ in &closed {
            self.metrics.connection_closed();
        }

        if !closed.is_empty() {
            logger::info(
                LogTag::Webserver,
                &format!("WsHub: closing {} connection(s)", closed.len()),
            );
        }

        closed.len()
    }

    pub fn metrics(&self) -> Arc<HubMetrics> {
        self.metrics.clone()
    }

    pub async fn active_connections(&self) -> usize {
        self.connections.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::TokenRecord;

    #[tokio::test]
    async fn test_hub_registration() {
        let hub = WsHub::new(10);

        let (conn_id1, _rx1) = hub.register_connection().await;
        let (conn_id2, _rx2) = hub.register_connection().await;

        assert_eq!(hub.active_connections().await, 2);
        assert_ne!(conn_id1, conn_id2);

        hub.unregister_connection(conn_id1).await;
        assert_eq!(hub.active_connections().await, 1);
        assert_eq!(hub.metrics().snapshot().active_connections, 1);
    }

    #[tokio::test]
    async fn test_hub_broadcast_reaches_every_connection() {
        let hub = WsHub::new(10);
        let (_id1, mut rx1) = hub.register_connection().await;
        let (_id2, mut rx2) = hub.register_connection().await;

        let report = hub
            .broadcast(&ServerMessage::TokenRemove("0xabc".to_string()))
            .await;
        assert_eq!(report, BroadcastReport { sent: 2, dropped: 0 });

        let expected = r#"{"event":"token_remove","data":"0xabc"}"#;
        assert_eq!(&*rx1.recv().await.unwrap(), expected);
        assert_eq!(&*rx2.recv().await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_full_queue_evicts_that_client_only() {
        let hub = WsHub::new(1);
        let (slow, mut slow_rx) = hub.register_connection().await;
        let (_fast, mut fast_rx) = hub.register_connection().await;

        let first = ServerMessage::TokenUpdate(TokenRecord::new("0xa"));
        hub.broadcast(&first).await;
        // Drain only the fast client
        assert!(fast_rx.recv().await.is_some());

        let report = hub
            .broadcast(&ServerMessage::TokenRemove("0xb".to_string()))
            .await;
        assert_eq!(report, BroadcastReport { sent: 1, dropped: 1 });

        let metrics = hub.metrics().snapshot();
        assert_eq!(metrics.total_messages_dropped, 1);
        assert_eq!(metrics.evicted_connections, 1);
        assert_eq!(metrics.active_connections, 1);
        assert_eq!(hub.active_connections().await, 1);

        // The slow client gets what was queued, then its queue ends
        assert!(slow_rx.recv().await.unwrap().contains("0xa"));
        assert!(slow_rx.recv().await.is_none());
        assert!(fast_rx.recv().await.unwrap().contains("0xb"));

        // Later broadcasts only reach the remaining client
        let report = hub
            .broadcast(&ServerMessage::TokenRemove("0xc".to_string()))
            .await;
        assert_eq!(report, BroadcastReport { sent: 1, dropped: 0 });

        // The connection task unregistering afterwards changes nothing
        hub.unregister_connection(slow).await;
        assert_eq!(hub.metrics().snapshot().active_connections, 1);
    }

    #[tokio::test]
    async fn test_broadcast_without_connections() {
        let hub = WsHub::new(10);
        let report = hub.broadcast(&ServerMessage::TokenList(Vec::new())).await;
        assert_eq!(report, BroadcastReport::default());
    }

    #[tokio::test]
    async fn test_close_all_ends_receivers() {
        let hub = WsHub::new(10);
        let (id, mut rx) = hub.register_connection().await;

        assert_eq!(hub.close_all().await, 1);
        assert_eq!(hub.active_connections().await, 0);
        assert!(rx.recv().await.is_none());

        // Late unregister from the connection task is harmless
        hub.unregister_connection(id).await;
        assert_eq!(hub.metrics().snapshot().active_connections, 0);
    }
}
