//! PostgreSQL event-store backend.
//!
//! Reads the relations maintained by the upstream ponder indexer:
//! - `_ponder_status` — checkpoint row with the last indexed block number
//! - `"borrowEvent"` — `(on_behalf_of, reserve, time)`
//! - `"supplyEvent"` — `(on_behalf_of, asset, time)`
//!
//! The store is strictly read-only: it never creates or mutates relations.
//! Connection parameters come from a single libpq-style URL:
//! `postgresql://[user[:password]@][host][:port][/dbname]`

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use lendsnap_core::error::SnapshotError;
use lendsnap_core::store::EventStore;
use lendsnap_core::types::{BorrowEvent, SupplyEvent};
use lendsnap_core::Address;

/// PostgreSQL-backed event store.
///
/// Wraps a connection pool; acquire with [`connect`](Self::connect) at
/// startup and release with [`close`](Self::close) on every exit path.
#[derive(Clone)]
pub struct PostgresEventStore {
    pool: PgPool,
}

impl PostgresEventStore {
    /// Connect to the event store.
    pub async fn connect(database_url: &str) -> Result<Self, SnapshotError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(|e| SnapshotError::Store(format!("postgres connect: {e}")))?;
        info!("event store connected");
        Ok(Self { pool })
    }

    /// Close the pool, releasing all connections.
    pub async fn close(&self) {
        self.pool.close().await;
        debug!("event store connection released");
    }

    /// The underlying connection pool (for custom queries and fixtures).
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

// ─── EventStore impl ──────────────────────────────────────────────────────────

#[async_trait]
impl EventStore for PostgresEventStore {
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
                     WHERE time > $1
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
fn address_column(row: &PgRow, column: &str) -> Result<Address, SnapshotError> {
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
fn time_column(row: &PgRow) -> Result<i64, SnapshotError> {
    let time: Option<i64> = row
        .try_get("time")
        .map_err(|e| SnapshotError::Store(e.to_string()))?;
    time.ok_or_else(|| SnapshotError::MalformedRow("missing time".into()))
}

#[cfg(test)]
mod tests {
    // Integration tests require a running PostgreSQL instance.
    // Set DATABASE_URL environment variable to enable.
    // Example: DATABASE_URL=postgresql://localhost/lendsnap_test cargo test

    use super::*;

    async fn fixture_store() -> PostgresEventStore {
        let url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set for integration tests");
        let store = PostgresEventStore::connect(&url).await.unwrap();

        for stmt in [
            "DROP TABLE IF EXISTS _ponder_status",
            "DROP TABLE IF EXISTS \"borrowEvent\"",
            "DROP TABLE IF EXISTS \"supplyEvent\"",
            "CREATE TABLE _ponder_status (block_number BIGINT)",
            "CREATE TABLE \"borrowEvent\" (on_behalf_of TEXT, reserve TEXT, time BIGINT)",
            "CREATE TABLE \"supplyEvent\" (on_behalf_of TEXT, asset TEXT, time BIGINT)",
        ] {
            sqlx::query(stmt).execute(store.pool()).await.unwrap();
        }
        store
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL (set DATABASE_URL to enable)"]
    async fn empty_status_table_reports_block_zero() {
        let store = fixture_store().await;
        assert_eq!(store.latest_block_number().await.unwrap(), 0);
        store.close().await;
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL (set DATABASE_URL to enable)"]
    async fn events_come_back_normalized_and_ordered() {
        let store = fixture_store().await;

        sqlx::query("INSERT INTO _ponder_status VALUES (19000000)")
            .execute(store.pool())
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO \"borrowEvent\" VALUES
             ('0xBbB', '0xY', 20), ('0xAaA', '0xX', 10)",
        )
        .execute(store.pool())
        .await
        .unwrap();

        assert_eq!(store.latest_block_number().await.unwrap(), 19_000_000);

        let events = store.borrow_events(None).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].on_behalf_of.as_str(), "0xaaa");
        assert_eq!(events[1].on_behalf_of.as_str(), "0xbbb");

        let delta = store.borrow_events(Some(10)).await.unwrap();
        assert_eq!(delta.len(), 1);
        assert_eq!(delta[0].time, 20);

        store.close().await;
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL (set DATABASE_URL to enable)"]
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
}
