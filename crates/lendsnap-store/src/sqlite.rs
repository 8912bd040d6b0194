//! SQLite event-store backend.
//!
//! Mirrors the Postgres relation shape over a single SQLite file, for
//! replaying local dumps of the upstream tables without a server. Also the
//! runnable test surface for the query layer — the Postgres tests need a
//! live database and are `#[ignore]`d, these are not.
//!
//! Unlike the Postgres backend, this one can create and populate the
//! relations ([`init_schema`](SqliteEventStore::init_schema) and the
//! `insert_*` fixture helpers), since local dumps are assembled here
//! rather than by the upstream indexer.

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use lendsnap_core::error::SnapshotError;
use lendsnap_core::store::EventStore;
use lendsnap_core::types::{BorrowEvent, SupplyEvent};
use lendsnap_core::Address;

/// SQLite-backed event store.
pub struct SqliteEventStore {
    pool: SqlitePool,
}

impl SqliteEventStore {
    /// Open (or create) a SQLite database at `path`.
    ///
    /// The path may be a plain file path (`"./events.db"`) or a full
    /// SQLite URL (`"sqlite:./events.db?mode=rwc"`).
    pub async fn open(path: &str) -> Result<Self, SnapshotError> {
        let url = if path.starts_with("sqlite:") {
            path.to_string()
        } else {
            format!("sqlite:{path}?mode=rwc")
        };

        let pool = SqlitePool::connect(&url)
            .await
            .map_err(|e| SnapshotError::Store(format!("sqlite open: {e}")))?;
        Ok(Self { pool })
    }

    /// Open an in-memory database. All data is lost when the pool drops.
    ///
    /// Pinned to a single pooled connection: every connection to
    /// `sqlite::memory:` gets its own database, so a larger pool would
    /// scatter the fixture across disjoint databases.
    pub async fn in_memory() -> Result<Self, SnapshotError> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| SnapshotError::Store(format!("sqlite open: {e}")))?;
        Ok(Self { pool })
    }

    /// Close the pool, releasing the database handle.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Create the three upstream relations if they don't already exist.
    pub async fn init_schema(&self) -> Result<(), SnapshotError> {
        for stmt in [
            "CREATE TABLE IF NOT EXISTS _ponder_status (
                block_number INTEGER
            );",
            "CREATE TABLE IF NOT EXISTS \"borrowEvent\" (
                on_behalf_of TEXT,
                reserve      TEXT,
                time         INTEGER
            );",
            "CREATE TABLE IF NOT EXISTS \"supplyEvent\" (
                on_behalf_of TEXT,
                asset        TEXT,
                time         INTEGER
            );",
            "CREATE INDEX IF NOT EXISTS idx_borrow_time ON \"borrowEvent\"(time);",
            "CREATE INDEX IF NOT EXISTS idx_supply_time ON \"supplyEvent\"(time);",
        ] {
            sqlx::query(stmt)
                .execute(&self.pool)
                .await
                .map_err(|e| SnapshotError::Store(e.to_string()))?;
        }
        debug!("sqlite schema initialized");
        Ok(())
    }

    /// Set the checkpoint row (replaces any existing one).
    pub async fn set_latest_block(&self, block_number: u64) -> Result<(), SnapshotError> {
        sqlx::query("DELETE FROM _ponder_status")
            .execute(&self.pool)
            .await
            .map_err(|e| SnapshotError::Store(e.to_string()))?;
        sqlx::query("INSERT INTO _ponder_status (block_number) VALUES (?)")
            .bind(block_number as i64)
            .execute(&self.pool)
            .await
            .map_err(|e| SnapshotError::Store(e.to_string()))?;
        Ok(())
    }

    /// Insert a borrow event (fixtures / local dumps).
    pub async fn insert_borrow(
        &self,
        on_behalf_of: &str,
        reserve: &str,
        time: i64,
    ) -> Result<(), SnapshotError> {
        sqlx::query("INSERT INTO \"borrowEvent\" (on_behalf_of, reserve, time) VALUES (?, ?, ?)")
            .bind(on_behalf_of)
            .bind(reserve)
            .bind(time)
            .execute(&self.pool)
            .await
            .map_err(|e| SnapshotError::Store(e.to_string()))?;
        Ok(())
    }

    /// Insert a supply event (fixtures / local dumps).
    pub async fn insert_supply(
        &self,
        on_behalf_of: &str,
        asset: &str,
        time: i64,
    ) -> Result<(), SnapshotError> {
        sqlx::query("INSERT INTO \"supplyEvent\" (on_behalf_of, asset, time) VALUES (?, ?, ?)")
            .bind(on_behalf_of)
            .bind(asset)
            .bind(time)
            .execute(&self.pool)
            .await
            .map_err(|e| SnapshotError::Store(e.to_string()))?;
        Ok(())
    }

    /// The underlying connection pool (for custom queries).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

// ─── EventStore impl ──────────────────────────────────────────────────────────

#[async_trait]
impl EventStore for SqliteEventStore {
    async fn latest_block_number(&self) -> Result<u64, SnapshotError> {
        let row = sqlx::query("SELECT block_number FROM _ponder_status LIMIT 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SnapshotError::Store(e.to_string()))?;

        match row {
            Some(row) => {
                let block: i64 = row
                    .try_get("block_number")
                    .map_err(|e| SnapshotError::Store(e.to_string()))?;
                Ok(block.max(0) as u64)
            }
            None => Ok(0),
        }
    }

    async fn borrow_events(
        &self,
        since: Option<i64>,
    ) -> Result<Vec<BorrowEvent>, SnapshotError> {
        let rows = match since {
            Some(cutoff) => {
                sqlx::query(
                    "SELECT on_behalf_of, reserve, time FROM \"borrowEvent\"
                     WHERE time > ?
                     ORDER BY time ASC",
                )
                .bind(cutoff)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(
                    "SELECT on_behalf_of, reserve, time FROM \"borrowEvent\"
                     ORDER BY time ASC",
                )
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(|e| SnapshotError::Store(e.to_string()))?;

        rows.iter()
            .map(|row| {
                Ok(BorrowEvent {
                    on_behalf_of: address_column(row, "on_behalf_of")?,
                    reserve: address_column(row, "reserve")?,
                    time: time_column(row)?,
                })
            })
            .collect()
    }

    async fn supply_events(&self) -> Result<Vec<SupplyEvent>, SnapshotError> {
        let rows = sqlx::query(
            "SELECT on_behalf_of, asset, time FROM \"supplyEvent\"
             ORDER BY time ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| SnapshotError::Store(e.to_string()))?;

        rows.iter()
            .map(|row| {
                Ok(SupplyEvent {
                    on_behalf_of: address_column(row, "on_behalf_of")?,
                    asset: address_column(row, "asset")?,
                    time: time_column(row)?,
                })
            })
            .collect()
    }
}

/// Decode an address column, rejecting NULL and empty values.
fn address_column(row: &SqliteRow, column: &str) -> Result<Address, SnapshotError> {
    let raw: Option<String> = row
        .try_get(column)
        .map_err(|e| SnapshotError::Store(e.to_string()))?;
    match raw {
        Some(raw) if !raw.is_empty() => Ok(Address::new(raw)),
        Some(_) => Err(SnapshotError::MalformedRow(format!("empty {column}"))),
        None => Err(SnapshotError::MalformedRow(format!("missing {column}"))),
    }
}

/// Decode the `time` ordering column, rejecting NULL.
fn time_column(row: &SqliteRow) -> Result<i64, SnapshotError> {
    let time: Option<i64> = row
        .try_get("time")
        .map_err(|e| SnapshotError::Store(e.to_string()))?;
    time.ok_or_else(|| SnapshotError::MalformedRow("missing time".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn fixture_store() -> SqliteEventStore {
        let store = SqliteEventStore::in_memory().await.unwrap();
        store.init_schema().await.unwrap();
        store
    }

    #[tokio::test]
    async fn empty_status_table_reports_block_zero() {
        let store = fixture_store().await;
        assert_eq!(store.latest_block_number().await.unwrap(), 0);
        store.close().await;
    }

    #[tokio::test]
    async fn checkpoint_roundtrip() {
        let store = fixture_store().await;
        store.set_latest_block(19_000_000).await.unwrap();
        assert_eq!(store.latest_block_number().await.unwrap(), 19_000_000);

        // Replacing the row, not appending.
        store.set_latest_block(19_000_500).await.unwrap();
        assert_eq!(store.latest_block_number().await.unwrap(), 19_000_500);
        store.close().await;
    }

    #[tokio::test]
    async fn events_come_back_normalized_and_ordered() {
        let store = fixture_store().await;
        store.insert_borrow("0xBbB", "0xY", 20).await.unwrap();
        store.insert_borrow("0xAaA", "0xX", 10).await.unwrap();

        let events = store.borrow_events(None).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].on_behalf_of.as_str(), "0xaaa");
        assert_eq!(events[0].time, 10);
        assert_eq!(events[1].on_behalf_of.as_str(), "0xbbb");
        store.close().await;
    }

    #[tokio::test]
    async fn since_cutoff_is_exclusive() {
        let store = fixture_store().await;
        store.insert_borrow("0xa", "0x1", 10).await.unwrap();
        store.insert_borrow("0xb", "0x2", 20).await.unwrap();

        let delta = store.borrow_events(Some(10)).await.unwrap();
        assert_eq!(delta.len(), 1);
        assert_eq!(delta[0].time, 20);
        store.close().await;
    }

    #[tokio::test]
    async fn null_address_is_a_malformed_row() {
        let store = fixture_store().await;
        sqlx::query("INSERT INTO \"supplyEvent\" VALUES (NULL, '0xA', 1)")
            .execute(store.pool())
            .await
            .unwrap();

        let err = store.supply_events().await.unwrap_err();
        assert!(matches!(err, SnapshotError::MalformedRow(_)));
        store.close().await;
    }

    #[tokio::test]
    async fn empty_address_is_a_malformed_row() {
        let store = fixture_store().await;
        store.insert_borrow("", "0xA", 1).await.unwrap();

        let err = store.borrow_events(None).await.unwrap_err();
        assert!(matches!(err, SnapshotError::MalformedRow(_)));
        store.close().await;
    }

    #[tokio::test]
    async fn missing_event_table_is_a_store_error() {
        let store = SqliteEventStore::in_memory().await.unwrap();
        let err = store.borrow_events(None).await.unwrap_err();
        assert!(matches!(err, SnapshotError::Store(_)));
        store.close().await;
    }
}
