/// Server-side token collection and snapshot diffing
///
/// The reconciler owns every record that has been added and not yet removed,
/// keyed by address with first-sighting order preserved. A record is updated
/// when its snapshot row differs structurally from the row seen on the
/// previous poll. The update is folded in with merge semantics: fields present
/// in the row overwrite, fields absent from it keep their last known value.
use std::collections::{HashMap, HashSet};

use crate::records::TokenRecord;

/// One change produced by [`TokenReconciler::reconcile`]
#[derive(Debug, Clone, PartialEq)]
pub enum TokenChange {
    Added(TokenRecord),
    /// Carries the full merged record
    Updated(TokenRecord),
    Removed(String),
}

impl TokenChange {
    pub fn address(&self) -> &str {
        match self {
            TokenChange::Added(record) | TokenChange::Updated(record) => &record.address,
            TokenChange::Removed(address) => address,
        }
    }
}

/// Counts per change kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeCounts {
    pub added: usize,
    pub updated: usize,
    pub removed: usize,
}

impl ChangeCounts {
    pub fn of(changes: &[TokenChange]) -> Self {
        changes.iter().fold(Self::default(), |mut counts, change| {
            match change {
                TokenChange::Added(_) => counts.added += 1,
                TokenChange::Updated(_) => counts.updated += 1,
                TokenChange::Removed(_) => counts.removed += 1,
            }
            counts
        })
    }

    pub fn total(&self) -> usize {
        self.added + self.updated + self.removed
    }
}

#[derive(Debug)]
struct Entry {
    /// What clients hold: every row merged in arrival order
    merged: TokenRecord,
    /// The row as last read from the source, compared against the next one
    last_seen: TokenRecord,
}

#[derive(Debug, Default)]
pub struct TokenReconciler {
    records: HashMap<String, Entry>,
    /// Addresses in first-sighting order
    order: Vec<String>,
}

impl TokenReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, address: &str) -> Option<&TokenRecord> {
        self.records.get(address).map(|entry| &entry.merged)
    }

    /// Every stored record in first-sighting order
    pub fn full_list(&self) -> Vec<TokenRecord> {
        self.order
            .iter()
            .filter_map(|address| self.records.get(address))
            .map(|entry| entry.merged.clone())
            .collect()
    }

    /// Fold a snapshot into the collection and return the resulting changes
    ///
    /// Adds and updates follow snapshot order; removals follow stored order
    /// and come last.
    pub fn reconcile(&mut self, snapshot: Vec<TokenRecord>) -> Vec<TokenChange> {
        let mut changes = Vec::new();
        let mut present: HashSet<String> = HashSet::with_capacity(snapshot.len());

        for record in snapshot {
            present.insert(record.address.clone());

            match self.records.get_mut(&record.address) {
                None => {
                    self.order.push(record.address.clone());
                    self.records.insert(
                        record.address.clone(),
                        Entry {
                            merged: record.clone(),
                            last_seen: record.clone(),
                        },
                    );
                    changes.push(TokenChange::Added(record));
                }
                Some(entry) => {
                    if entry.last_seen != record {
                        entry.merged.merge_from(record.clone());
                        entry.last_seen = record;
                        changes.push(TokenChange::Updated(entry.merged.clone()));
                    }
                }
            }
        }

        let records = &mut self.records;
        self.order.retain(|address| {
            if present.contains(address) {
                return true;
            }
            records.remove(address);
            changes.push(TokenChange::Removed(address.clone()));
            false
        });

        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(address: &str, holders: i64) -> TokenRecord {
        let mut record = TokenRecord::new(address);
        record.symbol = Some(address.trim_start_matches("0x").to_uppercase());
        record.gp_holder_count = Some(holders);
        record
    }

    #[test]
    fn test_empty_source_yields_nothing() {
        let mut reconciler = TokenReconciler::new();
        assert!(reconciler.reconcile(Vec::new()).is_empty());
        assert!(reconciler.is_empty());
    }

    #[test]
    fn test_add_update_remove_lifecycle() {
        let mut reconciler = TokenReconciler::new();

        let changes = reconciler.reconcile(vec![token("0xabc", 10)]);
        assert_eq!(changes, vec![TokenChange::Added(token("0xabc", 10))]);

        let changes = reconciler.reconcile(vec![token("0xabc", 11)]);
        assert_eq!(changes, vec![TokenChange::Updated(token("0xabc", 11))]);

        let changes = reconciler.reconcile(Vec::new());
        assert_eq!(changes, vec![TokenChange::Removed("0xabc".to_string())]);
        assert!(reconciler.is_empty());
    }

    #[test]
    fn test_unchanged_snapshot_is_idempotent() {
        let mut reconciler = TokenReconciler::new();
        let snapshot = vec![token("0xa", 1), token("0xb", 2), token("0xc", 3)];

        assert_eq!(reconciler.reconcile(snapshot.clone()).len(), 3);
        assert!(reconciler.reconcile(snapshot).is_empty());
    }

    #[test]
    fn test_update_keeps_fields_missing_from_snapshot() {
        let mut reconciler = TokenReconciler::new();
        let mut first = token("0xabc", 10);
        first.risk_level = Some("low".to_string());
        reconciler.reconcile(vec![first]);

        let changes = reconciler.reconcile(vec![token("0xabc", 12)]);

        match &changes[..] {
            [TokenChange::Updated(record)] => {
                assert_eq!(record.gp_holder_count, Some(12));
                assert_eq!(record.risk_level.as_deref(), Some("low"));
            }
            other => panic!("expected one update, got {:?}", other),
        }

        // The same row again is not an update
        assert!(reconciler.reconcile(vec![token("0xabc", 12)]).is_empty());
    }

    #[test]
    fn test_cleared_field_fires_one_update() {
        let mut reconciler = TokenReconciler::new();
        let mut first = token("0xabc", 10);
        first.risk_level = Some("high".to_string());
        reconciler.reconcile(vec![first]);

        // risk_level went NULL on a rescan; nothing else changed
        let changes = reconciler.reconcile(vec![token("0xabc", 10)]);
        match &changes[..] {
            [TokenChange::Updated(record)] => {
                assert_eq!(record.address, "0xabc");
                // Merge keeps the last known value
                assert_eq!(record.risk_level.as_deref(), Some("high"));
            }
            other => panic!("expected one update, got {:?}", other),
        }

        // Unchanged source afterwards stays quiet
        assert!(reconciler.reconcile(vec![token("0xabc", 10)]).is_empty());
    }

    #[test]
    fn test_change_order() {
        let mut reconciler = TokenReconciler::new();
        reconciler.reconcile(vec![token("0xa", 1), token("0xb", 1), token("0xc", 1)]);

        let changes = reconciler.reconcile(vec![token("0xd", 1), token("0xb", 2)]);
        let addresses: Vec<_> = changes.iter().map(|c| c.address().to_string()).collect();

        assert_eq!(addresses, vec!["0xd", "0xb", "0xa", "0xc"]);
        assert_eq!(
            ChangeCounts::of(&changes),
            ChangeCounts {
                added: 1,
                updated: 1,
                removed: 2
            }
        );
    }

    #[test]
    fn test_full_list_in_first_sighting_order() {
        let mut reconciler = TokenReconciler::new();
        reconciler.reconcile(vec![token("0xb", 1), token("0xa", 1)]);
        reconciler.reconcile(vec![token("0xc", 1), token("0xa", 5), token("0xb", 1)]);

        let list = reconciler.full_list();
        let addresses: Vec<_> = list.iter().map(|r| r.address.as_str()).collect();

        assert_eq!(addresses, vec!["0xb", "0xa", "0xc"]);
        assert_eq!(reconciler.get("0xa").unwrap().gp_holder_count, Some(5));
    }

    #[test]
    fn test_collection_matches_latest_snapshot_keys() {
        let mut reconciler = TokenReconciler::new();
        let snapshots = vec![
            vec![token("0x1", 1), token("0x2", 1)],
            vec![token("0x2", 2), token("0x3", 1)],
            vec![token("0x3", 1)],
            vec![token("0x1", 9), token("0x4", 1), token("0x3", 1)],
        ];

        for snapshot in snapshots {
            let expected: HashSet<String> = snapshot.iter().map(|r| r.address.clone()).collect();
            reconciler.reconcile(snapshot);
            let stored: HashSet<String> = reconciler
                .full_list()
                .into_iter()
                .map(|r| r.address)
                .collect();
            assert_eq!(stored, expected);
        }
    }
}
