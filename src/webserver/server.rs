/// Axum webserver implementation
///
/// Server lifecycle: bind, serve, graceful termination on a shutdown notify.
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use crate::{
    errors::ServerError,
    logger::{self, LogTag},
    webserver::{routes, state::AppState},
};

/// Bind the listener, translating common failures into actionable messages
pub async fn bind(host: &str, port: u16) -> Result<TcpListener, ServerError> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .map_err(|_| ServerError::InvalidAddress(format!("{}:{}", host, port)))?;

    TcpListener::bind(&addr).await.map_err(|e| {
        let message = match e.kind() {
            std::io::ErrorKind::AddrInUse => "Address already in use\n\
                 \n\
                 Another scanboard instance (or another service) is listening on this port.\n\
                 Stop it or start with --port <n>."
                .to_string(),
            std::io::ErrorKind::PermissionDenied => format!(
                "Permission denied\n\
                 \n\
                 Port {} requires elevated privileges on this system.\n\
                 Consider using a port above 1024 or running with appropriate permissions.",
                port
            ),
            _ => e.to_string(),
        };
        ServerError::Bind {
            addr: addr.to_string(),
            message,
        }
    })
}

/// Serve until `shutdown` is notified
pub async fn serve(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: Arc<Notify>,
) -> Result<(), ServerError> {
    if let Ok(addr) = listener.local_addr() {
        logger::info(
            LogTag::Webserver,
            &format!("Listening on http://{} (WebSocket at ws://{}/ws)", addr, addr),
        );
    }

    let app = build_app(state);

    let shutdown_signal = async move {
        shutdown.notified().await;
        logger::debug(
            LogTag::Webserver,
            "Received shutdown signal, stopping webserver...",
        );
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| ServerError::Serve(e.to_string()))?;

    logger::info(LogTag::Webserver, "Webserver stopped gracefully");
    Ok(())
}

fn build_app(state: Arc<AppState>) -> Router {
    routes::create_router(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PollerConfig, WebserverConfig};
    use crate::poller::PollerStats;
    use crate::reconciler::TokenReconciler;
    use crate::records::TokenRecord;
    use crate::webserver::ws::{ServerMessage, WsHub};
    use futures::{SinkExt, StreamExt};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::sync::Mutex;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    type Client =
        tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

    async fn start_test_server() -> (SocketAddr, Arc<AppState>, Arc<Notify>) {
        start_test_server_with(WebserverConfig::default()).await
    }

    async fn start_test_server_with(
        config: WebserverConfig,
    ) -> (SocketAddr, Arc<AppState>, Arc<Notify>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let reconciler = Arc::new(Mutex::new(TokenReconciler::new()));
        reconciler
            .lock()
            .await
            .reconcile(vec![TokenRecord::new("0xabc"), TokenRecord::new("0xdef")]);

        let state = Arc::new(AppState::new(
            config,
            PollerConfig::default(),
            WsHub::new(16),
            reconciler,
            PollerStats::new(),
        ));
        let shutdown = Arc::new(Notify::new());
        tokio::spawn(serve(listener, state.clone(), shutdown.clone()));

        (addr, state, shutdown)
    }

    async fn next_event(client: &mut Client) -> ServerMessage {
        let text = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match client.next().await {
                    Some(Ok(WsMessage::Text(text))) => return text,
                    Some(Ok(_)) => continue,
                    other => panic!("connection ended: {:?}", other),
                }
            }
        })
        .await
        .expect("no event within timeout");
        ServerMessage::parse(&text).unwrap()
    }

    async fn send(client: &mut Client, text: &str) {
        client.send(WsMessage::Text(text.to_string())).await.unwrap();
    }

    #[tokio::test]
    async fn test_request_reply_and_broadcast() {
        let (addr, state, shutdown) = start_test_server().await;
        let (mut client, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr))
            .await
            .unwrap();

        send(&mut client, r#"{"event":"get_tokens"}"#).await;
        match next_event(&mut client).await {
            ServerMessage::TokenList(tokens) => {
                let addresses: Vec<_> = tokens.iter().map(|t| t.address.as_str()).collect();
                assert_eq!(addresses, vec!["0xabc", "0xdef"]);
            }
            other => panic!("expected token_list, got {:?}", other),
        }

        send(&mut client, r#"{"event":"PING"}"#).await;
        assert!(matches!(
            next_event(&mut client).await,
            ServerMessage::Pong { time } if time > 0
        ));

        send(&mut client, r#"{"event":"bogus"}"#).await;
        assert!(matches!(
            next_event(&mut client).await,
            ServerMessage::Error { .. }
        ));

        // Still open after a rejected frame
        state
            .hub
            .broadcast(&ServerMessage::TokenRemove("0xabc".to_string()))
            .await;
        assert_eq!(
            next_event(&mut client).await,
            ServerMessage::TokenRemove("0xabc".to_string())
        );

        shutdown.notify_one();
    }

    #[tokio::test]
    async fn test_close_all_closes_client() {
        let (addr, state, shutdown) = start_test_server().await;
        let (mut client, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr))
            .await
            .unwrap();

        // Round-trip once so the connection is registered with the hub
        send(&mut client, r#"{"event":"PING"}"#).await;
        next_event(&mut client).await;
        assert_eq!(state.hub.active_connections().await, 1);

        state.hub.close_all().await;

        let closed = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match client.next().await {
                    Some(Ok(WsMessage::Close(_))) | None | Some(Err(_)) => return true,
                    Some(Ok(_)) => continue,
                }
            }
        })
        .await
        .unwrap_or(false);
        assert!(closed);

        shutdown.notify_one();
    }

    async fn connect(addr: SocketAddr) -> Client {
        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{}/ws", addr))
            .await
            .unwrap();
        client
    }

    /// Plain HTTP/1.1 GET; returns the JSON body
    async fn http_get_json(addr: SocketAddr, path: &str) -> serde_json::Value {
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let request = format!(
            "GET {} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            path, addr
        );
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();
        assert!(raw.starts_with("HTTP/1.1 200"), "unexpected response: {}", raw);
        let (_, body) = raw.split_once("\r\n\r\n").unwrap();
        serde_json::from_str(body).unwrap()
    }

    #[tokio::test]
    async fn test_status_reports_live_counters() {
        let (addr, state, shutdown) = start_test_server().await;
        let mut client = connect(addr).await;
        send(&mut client, r#"{"event":"PING"}"#).await;
        next_event(&mut client).await;

        state
            .hub
            .broadcast(&ServerMessage::TokenRemove("0xzzz".to_string()))
            .await;
        next_event(&mut client).await;

        let status = http_get_json(addr, "/api/status").await;

        assert_eq!(status["status"], "ok");
        assert_eq!(status["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(status["active_connections"], 1);
        assert_eq!(status["record_count"], 2);
        assert_eq!(status["poll_interval_ms"], 2000);
        assert_eq!(status["hub"]["total_connections"], 1);
        assert_eq!(status["hub"]["total_messages_sent"], 1);
        assert_eq!(status["poller"]["ticks"], 0);

        shutdown.notify_one();
    }

    fn fast_heartbeat_config() -> WebserverConfig {
        let mut config = WebserverConfig::default();
        config.websocket.heartbeat_secs = 1;
        config.websocket.client_idle_timeout_secs = 2;
        config
    }

    #[tokio::test]
    async fn test_silent_client_is_closed() {
        let (addr, state, shutdown) = start_test_server_with(fast_heartbeat_config()).await;
        let mut client = connect(addr).await;

        // Never read: server pings go unanswered and the client goes idle
        tokio::time::sleep(Duration::from_millis(3500)).await;

        let closed = tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                match client.next().await {
                    Some(Ok(WsMessage::Close(_))) | None | Some(Err(_)) => return true,
                    Some(Ok(_)) => continue,
                }
            }
        })
        .await
        .unwrap_or(false);
        assert!(closed);
        assert_eq!(state.hub.active_connections().await, 0);

        shutdown.notify_one();
    }

    #[tokio::test]
    async fn test_heartbeat_keeps_responsive_client_open() {
        let (addr, state, shutdown) = start_test_server_with(fast_heartbeat_config()).await;
        let mut client = connect(addr).await;

        // Reading answers server pings; run well past the idle timeout
        let deadline = tokio::time::Instant::now() + Duration::from_secs(4);
        let mut pings = 0;
        loop {
            match tokio::time::timeout_at(deadline, client.next()).await {
                Err(_) => break,
                Ok(Some(Ok(WsMessage::Ping(_)))) => pings += 1,
                Ok(Some(Ok(_))) => {}
                Ok(other) => panic!("connection ended: {:?}", other),
            }
        }
        assert!(pings >= 1);
        assert_eq!(state.hub.active_connections().await, 1);

        send(&mut client, r#"{"event":"PING"}"#).await;
        assert!(matches!(
            next_event(&mut client).await,
            ServerMessage::Pong { .. }
        ));

        shutdown.notify_one();
    }

    #[tokio::test]
    async fn test_bind_rejects_invalid_host() {
        let err = bind("not a host", 3003).await.unwrap_err();
        assert!(matches!(err, ServerError::InvalidAddress(_)));
    }
}
