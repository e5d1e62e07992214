/// Client-side copy of the server's token collection
///
/// Applies server events in arrival order. The store never writes ahead of the
/// server: every mutation comes from an event.
use crate::logger::{self, LogTag};
use crate::records::TokenRecord;
use crate::webserver::ws::ServerMessage;

#[derive(Debug, Default)]
pub struct ClientStore {
    /// Newest first: unknown tokens are prepended
    tokens: Vec<TokenRecord>,
    /// Bumped on every change to `tokens`
    revision: u64,
    last_pong: Option<i64>,
    last_error: Option<String>,
}

impl ClientStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tokens(&self) -> &[TokenRecord] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, address: &str) -> Option<&TokenRecord> {
        self.tokens.iter().find(|t| t.address == address)
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Server time (unix ms) carried by the last `PONG`
    pub fn last_pong(&self) -> Option<i64> {
        self.last_pong
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Apply one server event; returns whether the token collection changed
    pub fn apply(&mut self, message: ServerMessage) -> bool {
        match message {
            ServerMessage::TokenList(tokens) => {
                self.tokens = tokens;
                self.revision += 1;
                true
            }
            ServerMessage::TokenUpdate(update) => {
                self.upsert(update);
                self.revision += 1;
                true
            }
            ServerMessage::TokenRemove(address) => {
                let before = self.tokens.len();
                self.tokens.retain(|t| t.address != address);
                let removed = self.tokens.len() != before;
                if removed {
                    self.revision += 1;
                }
                removed
            }
            ServerMessage::Pong { time } => {
                self.last_pong = Some(time);
                false
            }
            ServerMessage::Error { message } => {
                logger::warning(LogTag::Client, &format!("Server rejected request: {}", message));
                self.last_error = Some(message);
                false
            }
        }
    }

    fn upsert(&mut self, update: TokenRecord) {
        match self.tokens.iter_mut().find(|t| t.address == update.address) {
            Some(existing) => {
                let holders_changed = update.gp_holder_count.is_some()
                    && update.gp_holder_count != existing.gp_holder_count;
                let liquidity_changed =
                    update.liq30.is_some() && update.liq30 != existing.liq30;

                existing.merge_from(update);
                existing.holders_changed = Some(holders_changed);
                existing.liquidity_changed = Some(liquidity_changed);
            }
            None => self.tokens.insert(0, update),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(address: &str, holders: i64) -> TokenRecord {
        let mut record = TokenRecord::new(address);
        record.gp_holder_count = Some(holders);
        record
    }

    fn addresses(store: &ClientStore) -> Vec<&str> {
        store.tokens().iter().map(|t| t.address.as_str()).collect()
    }

    #[test]
    fn test_list_replaces_wholesale() {
        let mut store = ClientStore::new();
        store.apply(ServerMessage::TokenUpdate(token("0xold", 1)));

        assert!(store.apply(ServerMessage::TokenList(vec![token("0xa", 1), token("0xb", 2)])));
        assert_eq!(addresses(&store), vec!["0xa", "0xb"]);
    }

    #[test]
    fn test_update_prepends_unknown_token() {
        let mut store = ClientStore::new();
        store.apply(ServerMessage::TokenList(vec![token("0xa", 1)]));
        store.apply(ServerMessage::TokenUpdate(token("0xnew", 5)));

        assert_eq!(addresses(&store), vec!["0xnew", "0xa"]);
    }

    #[test]
    fn test_update_merges_and_flags_changes() {
        let mut store = ClientStore::new();
        let mut original = token("0xa", 10);
        original.liq30 = Some(500.0);
        original.name = Some("Alpha".to_string());
        store.apply(ServerMessage::TokenList(vec![original]));

        let mut update = TokenRecord::new("0xa");
        update.gp_holder_count = Some(12);
        update.liq30 = Some(500.0);
        store.apply(ServerMessage::TokenUpdate(update));

        let merged = store.get("0xa").unwrap();
        assert_eq!(merged.gp_holder_count, Some(12));
        assert_eq!(merged.name.as_deref(), Some("Alpha"));
        assert_eq!(merged.holders_changed, Some(true));
        assert_eq!(merged.liquidity_changed, Some(false));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_deletes_by_key() {
        let mut store = ClientStore::new();
        store.apply(ServerMessage::TokenList(vec![token("0xa", 1), token("0xb", 1)]));

        assert!(store.apply(ServerMessage::TokenRemove("0xa".to_string())));
        assert_eq!(addresses(&store), vec!["0xb"]);

        let revision = store.revision();
        assert!(!store.apply(ServerMessage::TokenRemove("0xmissing".to_string())));
        assert_eq!(store.revision(), revision);
    }

    #[test]
    fn test_pong_and_error_do_not_touch_tokens() {
        let mut store = ClientStore::new();
        let revision = store.revision();

        assert!(!store.apply(ServerMessage::Pong { time: 1_700_000_000_123 }));
        assert!(!store.apply(ServerMessage::error("unknown event")));

        assert_eq!(store.last_pong(), Some(1_700_000_000_123));
        assert_eq!(store.last_error(), Some("unknown event"));
        assert_eq!(store.revision(), revision);
    }
}
