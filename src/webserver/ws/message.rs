/// WebSocket message schema
///
/// Every frame is a JSON text frame of the form `{"event": <name>, "data": <payload>}`.
/// Events without a payload omit `data`.
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::errors::ChannelError;
use crate::reconciler::TokenChange;
use crate::records::TokenRecord;

// ============================================================================
// CLIENT MESSAGES (Client → Server)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Liveness check, answered with [`ServerMessage::Pong`]
    #[serde(rename = "PING")]
    Ping,

    /// Request the full token list for this client only
    GetTokens,
}

impl ClientMessage {
    pub fn parse(text: &str) -> Result<Self, ChannelError> {
        serde_json::from_str(text).map_err(|e| ChannelError::InvalidMessage(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ============================================================================
// SERVER MESSAGES (Server → Client)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Full collection in first-sighting order
    TokenList(Vec<TokenRecord>),

    /// Upsert by address
    TokenUpdate(TokenRecord),

    /// Delete by address
    TokenRemove(String),

    #[serde(rename = "PONG")]
    Pong { time: i64 },

    /// Rejected client frame
    Error { message: String },
}

impl ServerMessage {
    pub fn pong_now() -> Self {
        ServerMessage::Pong {
            time: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error {
            message: message.into(),
        }
    }

    pub fn parse(text: &str) -> Result<Self, ChannelError> {
        serde_json::from_str(text).map_err(|e| ChannelError::InvalidMessage(e.to_string()))
    }

    /// Serialize to JSON text
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize once into a frame shareable across connection queues
    pub fn to_frame(&self) -> Result<Arc<str>, ChannelError> {
        Ok(Arc::from(self.to_json()?))
    }

    pub fn event_name(&self) -> &'static str {
        match self {
            ServerMessage::TokenList(_) => "token_list",
            ServerMessage::TokenUpdate(_) => "token_update",
            ServerMessage::TokenRemove(_) => "token_remove",
            ServerMessage::Pong { .. } => "PONG",
            ServerMessage::Error { .. } => "error",
        }
    }
}

/// Added and updated records are both sent as `token_update`
impl From<TokenChange> for ServerMessage {
    fn from(change: TokenChange) -> Self {
        match change {
            TokenChange::Added(record) | TokenChange::Updated(record) => {
                ServerMessage::TokenUpdate(record)
            }
            TokenChange::Removed(address) => ServerMessage::TokenRemove(address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_messages_parse() {
        assert_eq!(
            ClientMessage::parse(r#"{"event":"PING"}"#).unwrap(),
            ClientMessage::Ping
        );
        assert_eq!(
            ClientMessage::parse(r#"{"event":"get_tokens"}"#).unwrap(),
            ClientMessage::GetTokens
        );
    }

    #[test]
    fn test_unknown_client_event_rejected() {
        let err = ClientMessage::parse(r#"{"event":"subscribe","data":{}}"#).unwrap_err();
        assert!(matches!(err, ChannelError::InvalidMessage(_)));
        assert!(ClientMessage::parse("not json").is_err());
    }

    #[test]
    fn test_server_message_wire_format() {
        let remove = serde_json::to_value(ServerMessage::TokenRemove("0xabc".into())).unwrap();
        assert_eq!(remove, json!({"event": "token_remove", "data": "0xabc"}));

        let pong = serde_json::to_value(ServerMessage::Pong { time: 1_700_000_000_000 }).unwrap();
        assert_eq!(pong, json!({"event": "PONG", "data": {"time": 1_700_000_000_000i64}}));

        let mut record = TokenRecord::new("0xabc");
        record.gp_holder_count = Some(3);
        let update = serde_json::to_value(ServerMessage::TokenUpdate(record)).unwrap();
        assert_eq!(
            update,
            json!({"event": "token_update", "data": {"address": "0xabc", "gpHolderCount": 3}})
        );

        let list = serde_json::to_value(ServerMessage::TokenList(Vec::new())).unwrap();
        assert_eq!(list, json!({"event": "token_list", "data": []}));
    }

    #[test]
    fn test_changes_map_to_events() {
        let added: ServerMessage = TokenChange::Added(TokenRecord::new("0xa")).into();
        let removed: ServerMessage = TokenChange::Removed("0xb".into()).into();

        assert_eq!(added.event_name(), "token_update");
        assert_eq!(removed, ServerMessage::TokenRemove("0xb".into()));
    }

    #[test]
    fn test_frame_parses_back() {
        let msg = ServerMessage::error("bad frame");
        let frame = msg.to_frame().unwrap();
        assert_eq!(ServerMessage::parse(&frame).unwrap(), msg);
    }
}
