//! The event-store contract the replayer consumes.
//!
//! Backend implementations live in `lendsnap-store` (Postgres for
//! production, SQLite for local replays); [`MemoryEventStore`] below serves
//! unit tests.

use async_trait::async_trait;

use crate::error::SnapshotError;
use crate::types::{BorrowEvent, SupplyEvent};

/// Read-only access to the upstream indexer's event relations.
///
/// Implementations must return each stream in ascending `time` order.
/// Relative order between events with identical `time` values is
/// unspecified; the replay fold is commutative within a stream, so ties
/// cannot change the resulting snapshot.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Highest block number the upstream indexer reports as fully indexed.
    ///
    /// Returns 0 when no checkpoint row exists ("nothing indexed yet").
    /// Surfaced in the artifact as metadata; never used as a query bound.
    async fn latest_block_number(&self) -> Result<u64, SnapshotError>;

    /// Borrow events in ascending `time` order.
    ///
    /// `Some(cutoff)` restricts the scan to `time > cutoff` for
    /// incremental resume; `None` scans the full relation.
    async fn borrow_events(
        &self,
        since: Option<i64>,
    ) -> Result<Vec<BorrowEvent>, SnapshotError>;

    /// All supply events in ascending `time` order.
    ///
    /// No `since` counterpart: collateral attaches retroactively when an
    /// address first borrows, so the supply stream is always scanned in
    /// full.
    async fn supply_events(&self) -> Result<Vec<SupplyEvent>, SnapshotError>;
}

// ─── In-memory store (for testing) ────────────────────────────────────────────

/// In-memory event store for tests and examples.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    borrows: Vec<BorrowEvent>,
    supplies: Vec<SupplyEvent>,
    block_number: u64,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the checkpoint block number the store reports.
    pub fn set_block_number(&mut self, block_number: u64) {
        self.block_number = block_number;
    }

    /// Record a borrow event. Insertion order is irrelevant; queries sort.
    pub fn push_borrow(&mut self, on_behalf_of: &str, reserve: &str, time: i64) {
        self.borrows.push(BorrowEvent {
            on_behalf_of: on_behalf_of.into(),
            reserve: reserve.into(),
            time,
        });
    }

    /// Record a supply event.
    pub fn push_supply(&mut self, on_behalf_of: &str, asset: &str, time: i64) {
        self.supplies.push(SupplyEvent {
            on_behalf_of: on_behalf_of.into(),
            asset: asset.into(),
            time,
        });
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn latest_block_number(&self) -> Result<u64, SnapshotError> {
        Ok(self.block_number)
    }

    async fn borrow_events(
        &self,
        since: Option<i64>,
    ) -> Result<Vec<BorrowEvent>, SnapshotError> {
        let mut events: Vec<_> = self
            .borrows
            .iter()
            .filter(|e| since.map_or(true, |cutoff| e.time > cutoff))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.time);
        Ok(events)
    }

    async fn supply_events(&self) -> Result<Vec<SupplyEvent>, SnapshotError> {
        let mut events = self.supplies.clone();
        events.sort_by_key(|e| e.time);
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_store_reports_block_zero() {
        let store = MemoryEventStore::new();
        assert_eq!(store.latest_block_number().await.unwrap(), 0);
        assert!(store.borrow_events(None).await.unwrap().is_empty());
        assert!(store.supply_events().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn events_returned_in_time_order() {
        let mut store = MemoryEventStore::new();
        store.push_borrow("0xa", "0x1", 30);
        store.push_borrow("0xb", "0x2", 10);
        store.push_borrow("0xc", "0x3", 20);

        let events = store.borrow_events(None).await.unwrap();
        let times: Vec<_> = events.iter().map(|e| e.time).collect();
        assert_eq!(times, vec![10, 20, 30]);
    }

    #[tokio::test]
    async fn since_cutoff_is_exclusive() {
        let mut store = MemoryEventStore::new();
        store.push_borrow("0xa", "0x1", 10);
        store.push_borrow("0xb", "0x2", 20);

        let events = store.borrow_events(Some(10)).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].time, 20);
    }
}
