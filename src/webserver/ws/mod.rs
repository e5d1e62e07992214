/// WebSocket hub module
///
/// One `/ws` endpoint carries the token event stream to every dashboard client.
///
/// ## Key Components
/// - `hub`: connection registry and broadcast fan-out with backpressure
/// - `connection`: per-socket lifecycle, request handling and heartbeat
/// - `message`: wire events in both directions
/// - `health`: heartbeat and idle tracking
/// - `metrics`: hub counters for the status endpoint
pub mod connection;
pub mod health;
pub mod hub;
pub mod message;
pub mod metrics;

pub use hub::{BroadcastReport, ConnectionId, WsHub};
pub use message::{ClientMessage, ServerMessage};
