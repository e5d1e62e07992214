//! HTTP and WebSocket server
//!
//! - `server`: bind, serve, graceful shutdown
//! - `routes`: `/ws` and `/api/status`
//! - `state`: handles shared with route handlers
//! - `ws`: hub, connection handling and wire messages

mod server;

pub mod routes;
pub mod state;
pub mod ws;

// Public API for starting/stopping the webserver
pub use server::{bind, serve};
pub use state::AppState;
