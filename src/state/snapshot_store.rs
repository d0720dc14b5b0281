use std::sync::Arc;

use tokio::sync::watch;

use crate::types::Snapshot;

// ---------------------------------------------------------------------------
// SnapshotStore
// ---------------------------------------------------------------------------

/// Holds the latest published snapshot.
///
/// The value is an immutable `Arc<Snapshot>` swapped whole through a watch
/// channel: the scheduler is the only writer, readers clone the `Arc` and
/// always see a complete (table, stats, timestamp) triple.
pub struct SnapshotStore {
    tx: watch::Sender<Option<Arc<Snapshot>>>,
}

impl SnapshotStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Replace the current snapshot.
    pub fn publish(&self, snapshot: Snapshot) {
        self.tx.send_replace(Some(Arc::new(snapshot)));
    }

    /// Latest snapshot, or None before the first successful cycle.
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.tx.borrow().clone()
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::aggregate;
    use crate::types::TickerRow;
    use chrono::Local;

    fn snapshot(symbol: &str) -> Snapshot {
        let rows = vec![TickerRow {
            name: symbol.to_string(),
            symbol: symbol.to_string(),
            last_price: Some(2.0),
            volume: Some(3.0),
            quote_volume: Some(6.0),
            price_change_percent: Some(1.0),
            weighted_avg_price: Some(2.0),
        }];
        let (table, stats) = aggregate(&rows, Local::now());
        Snapshot::new(table, stats)
    }

    #[test]
    fn empty_until_first_publish() {
        let store = SnapshotStore::new();
        assert!(store.latest().is_none());

        store.publish(snapshot("BTC"));
        assert_eq!(store.latest().unwrap().rows[0].symbol, "BTC");
    }

    #[test]
    fn readers_keep_the_snapshot_they_took() {
        let store = SnapshotStore::new();
        store.publish(snapshot("OLD"));
        let held = store.latest().unwrap();

        store.publish(snapshot("NEW"));
        assert_eq!(held.rows[0].symbol, "OLD");
        assert_eq!(held.last_updated, held.stats.timestamp);
        assert_eq!(store.latest().unwrap().rows[0].symbol, "NEW");
    }
}
