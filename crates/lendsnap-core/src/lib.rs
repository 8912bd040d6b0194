//! lendsnap-core — borrower-position snapshot construction.
//!
//! # Pipeline
//!
//! ```text
//! EventStore (Postgres / SQLite / memory)
//!     ├── latest_block_number()      checkpoint metadata
//!     ├── borrow_events()   ─┐
//!     └── supply_events()   ─┴─ Replayer fold → Snapshot → borrowers.json
//! ```
//!
//! Borrow events open positions and grow debt sets; supply events grow the
//! collateral sets of positions that already exist. The resulting mapping,
//! keyed by lowercase address, is serialized together with the upstream
//! indexer's checkpoint block number into a single JSON artifact that the
//! downstream liquidation engine reads as its candidate working set.

pub mod address;
pub mod error;
pub mod replay;
pub mod snapshot;
pub mod store;
pub mod types;

pub use address::Address;
pub use error::SnapshotError;
pub use replay::{replay_full, replay_incremental, Replayer};
pub use snapshot::{Snapshot, DEFAULT_SNAPSHOT_FILE};
pub use store::EventStore;
pub use types::{BorrowEvent, BorrowerPosition, SupplyEvent};
