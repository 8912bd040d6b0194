//! Event replay — folds the borrow and supply streams into per-borrower
//! position sets.
//!
//! The fold itself ([`Replayer`]) is pure and synchronous; [`replay_full`]
//! and [`replay_incremental`] drive it from an [`EventStore`].
//!
//! The borrow stream is folded before the supply stream. This is a strict
//! ordering requirement, not an optimization: a supply event only attaches
//! collateral to an address that already holds a position, and positions
//! are created exclusively by borrow events.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::address::Address;
use crate::error::SnapshotError;
use crate::snapshot::Snapshot;
use crate::store::EventStore;
use crate::types::{BorrowEvent, BorrowerPosition, SupplyEvent};

// ─── Replayer ─────────────────────────────────────────────────────────────────

/// Accumulates borrower positions from ordered event streams.
///
/// Set insertion is idempotent, so replaying the same event twice is a
/// no-op, and the relative order of events with identical `time` values
/// cannot change the result.
#[derive(Debug, Default)]
pub struct Replayer {
    positions: BTreeMap<Address, BorrowerPosition>,
    /// Highest borrow-event `time` folded so far.
    last_event_time: i64,
}

impl Replayer {
    /// Start from an empty position mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume from the positions of a prior snapshot.
    pub fn resume_from(snapshot: Snapshot) -> Self {
        Self {
            last_event_time: snapshot.last_event_time,
            positions: snapshot.borrowers,
        }
    }

    /// Apply one borrow event: open a position or grow its debt set.
    pub fn apply_borrow(&mut self, event: &BorrowEvent) {
        self.last_event_time = self.last_event_time.max(event.time);
        match self.positions.get_mut(&event.on_behalf_of) {
            Some(position) => {
                position.debt.insert(event.reserve.clone());
            }
            None => {
                self.positions.insert(
                    event.on_behalf_of.clone(),
                    BorrowerPosition::opened_by(
                        event.on_behalf_of.clone(),
                        event.reserve.clone(),
                    ),
                );
            }
        }
    }

    /// Apply one supply event: grow the collateral set of an existing
    /// position. A supply by an address with no position is discarded —
    /// supply-only addresses are never materialized.
    pub fn apply_supply(&mut self, event: &SupplyEvent) {
        if let Some(position) = self.positions.get_mut(&event.on_behalf_of) {
            position.collateral.insert(event.asset.clone());
        }
    }

    /// Number of positions accumulated so far.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Returns `true` if no positions have been accumulated.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Highest borrow-event `time` folded so far (0 if none).
    pub fn last_event_time(&self) -> i64 {
        self.last_event_time
    }

    /// Consume the replayer, yielding the accumulated mapping.
    pub fn into_positions(self) -> BTreeMap<Address, BorrowerPosition> {
        self.positions
    }
}

// ─── Store-driven replay ──────────────────────────────────────────────────────

/// Replay both event streams from scratch.
pub async fn replay_full<S>(store: &S) -> Result<Replayer, SnapshotError>
where
    S: EventStore + ?Sized,
{
    replay_into(store, Replayer::new(), None).await
}

/// Replay on top of a prior snapshot.
///
/// Only borrow events newer than the snapshot's `last_event_time` are
/// fetched; the supply stream is always replayed in full, since a supply
/// that predates an address's first borrow must attach once that address
/// becomes a borrower.
pub async fn replay_incremental<S>(
    store: &S,
    prior: Snapshot,
) -> Result<Replayer, SnapshotError>
where
    S: EventStore + ?Sized,
{
    let since = prior.last_event_time;
    info!(since, borrowers = prior.borrowers.len(), "resuming from prior snapshot");
    replay_into(store, Replayer::resume_from(prior), Some(since)).await
}

async fn replay_into<S>(
    store: &S,
    mut replayer: Replayer,
    since: Option<i64>,
) -> Result<Replayer, SnapshotError>
where
    S: EventStore + ?Sized,
{
    let borrows = store.borrow_events(since).await?;
    debug!(count = borrows.len(), "borrow events fetched");
    for event in &borrows {
        replayer.apply_borrow(event);
    }

    let supplies = store.supply_events().await?;
    debug!(count = supplies.len(), "supply events fetched");
    for event in &supplies {
        replayer.apply_supply(event);
    }

    info!(borrowers = replayer.len(), "replay complete");
    Ok(replayer)
}
