//! lendsnap-store — event-store backends for LendSnap.
//!
//! Backends:
//! - [`postgres`] — PostgreSQL via `sqlx` (production; the upstream ponder
//!   indexer writes its event tables to Postgres)
//! - [`sqlite`] — SQLite via `sqlx` (replays from local dumps, and the
//!   runnable test surface for the query layer)
//!
//! Both implement [`lendsnap_core::EventStore`] over the same three
//! relations: `_ponder_status`, `"borrowEvent"`, and `"supplyEvent"`.

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub use postgres::PostgresEventStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteEventStore;
