/// Reconciliation loop
///
/// Every tick: fetch a snapshot, fold it into the shared [`TokenReconciler`],
/// broadcast one event per change. Ticks are skipped when nobody is
/// connected or when the previous tick is still running.
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, Notify};
use tokio::time::MissedTickBehavior;

use crate::arguments::is_debug_poller_enabled;
use crate::logger::{self, LogTag};
use crate::reconciler::{ChangeCounts, TokenReconciler};
use crate::records::ScanSource;
use crate::webserver::ws::{ServerMessage, WsHub};

/// What one tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    NoClients,
    /// A previous tick is still in flight
    Busy,
    /// The fetch failed; stored state untouched
    Failed,
    Applied {
        added: usize,
        updated: usize,
        removed: usize,
    },
}

#[derive(Debug, Default)]
pub struct PollerStats {
    ticks: AtomicU64,
    skipped_no_clients: AtomicU64,
    skipped_busy: AtomicU64,
    failed: AtomicU64,
    events_emitted: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PollerStatsSnapshot {
    pub ticks: u64,
    pub skipped_no_clients: u64,
    pub skipped_busy: u64,
    pub failed: u64,
    pub events_emitted: u64,
}

impl PollerStats {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn snapshot(&self) -> PollerStatsSnapshot {
        PollerStatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            skipped_no_clients: self.skipped_no_clients.load(Ordering::Relaxed),
            skipped_busy: self.skipped_busy.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
        }
    }
}

/// Clears the busy flag when the tick ends, including on early return
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ScanPoller {
    source: Arc<dyn ScanSource>,
    reconciler: Arc<Mutex<TokenReconciler>>,
    hub: Arc<WsHub>,
    max_rows: usize,
    busy: AtomicBool,
    stats: Arc<PollerStats>,
}

impl ScanPoller {
    pub fn new(
        source: Arc<dyn ScanSource>,
        reconciler: Arc<Mutex<TokenReconciler>>,
        hub: Arc<WsHub>,
        max_rows: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            source,
            reconciler,
            hub,
            max_rows,
            busy: AtomicBool::new(false),
            stats: PollerStats::new(),
        })
    }

    pub fn stats(&self) -> Arc<PollerStats> {
        Arc::clone(&self.stats)
    }

    /// Run one reconciliation tick
    pub async fn poll_once(&self) -> PollOutcome {
        self.stats.ticks.fetch_add(1, Ordering::Relaxed);

        if self.hub.active_connections().await == 0 {
            self.stats.skipped_no_clients.fetch_add(1, Ordering::Relaxed);
            if is_debug_poller_enabled() {
                logger::debug(LogTag::Poller, "No clients connected, skipping tick");
            }
            return PollOutcome::NoClients;
        }

        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.stats.skipped_busy.fetch_add(1, Ordering::Relaxed);
            logger::debug(LogTag::Poller, "Previous tick still running, skipping");
            return PollOutcome::Busy;
        }
        let _busy = BusyGuard(&self.busy);

        let snapshot = match self.source.fetch_snapshot(self.max_rows).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                self.stats.failed.fetch_add(1, Ordering::Relaxed);
                logger::error(LogTag::Poller, &format!("Snapshot fetch failed: {}", e));
                return PollOutcome::Failed;
            }
        };
        let fetched = snapshot.len();

        let changes = self.reconciler.lock().await.reconcile(snapshot);
        let counts = ChangeCounts::of(&changes);

        for change in changes {
            self.hub.broadcast(&ServerMessage::from(change)).await;
        }
        self.stats
            .events_emitted
            .fetch_add(counts.total() as u64, Ordering::Relaxed);

        if counts.total() > 0 {
            logger::info(
                LogTag::Poller,
                &format!(
                    "Reconciled {} records: +{} ~{} -{}",
                    fetched, counts.added, counts.updated, counts.removed
                ),
            );
        } else if is_debug_poller_enabled() {
            logger::debug(
                LogTag::Poller,
                &format!("Reconciled {} records: no changes", fetched),
            );
        }

        PollOutcome::Applied {
            added: counts.added,
            updated: counts.updated,
            removed: counts.removed,
        }
    }

    /// Tick every `interval` until `shutdown` is notified
    ///
    /// A tick in progress when shutdown arrives finishes first.
    pub async fn run(self: Arc<Self>, interval: Duration, shutdown: Arc<Notify>) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        logger::info(
            LogTag::Poller,
            &format!(
                "Polling every {}ms (max {} rows)",
                interval.as_millis(),
                self.max_rows
            ),
        );

        loop {
            tokio::select! {
                _ = shutdown.notified() => break,
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
            }
        }

        logger::info(LogTag::Poller, "Poller stopped");
    }
}
