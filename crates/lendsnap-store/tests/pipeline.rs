//! End-to-end pipeline test over the SQLite backend: populate the upstream
//! relations, replay, write the artifact, and check the consumer-facing
//! JSON shape.

#![cfg(feature = "sqlite")]

use lendsnap_core::{replay_full, replay_incremental, EventStore, Snapshot};
use lendsnap_store::SqliteEventStore;

async fn seeded_store() -> SqliteEventStore {
    let store = SqliteEventStore::in_memory().await.unwrap();
    store.init_schema().await.unwrap();
    store.set_latest_block(19_000_000).await.unwrap();

    // Mixed-case addresses on purpose: the artifact must collapse them.
    store.insert_borrow("0xAlice", "0xUSDC", 1).await.unwrap();
    store.insert_borrow("0xBob", "0xWETH", 2).await.unwrap();
    store.insert_borrow("0xalice", "0xDAI", 3).await.unwrap();
    store.insert_supply("0xALICE", "0xUSDC", 4).await.unwrap();
    store.insert_supply("0xbob", "0xWBTC", 5).await.unwrap();
    store.insert_supply("0xCarol", "0xUSDC", 6).await.unwrap(); // never borrows

    store
}

#[tokio::test]
async fn full_pipeline_produces_consumer_artifact() {
    let store = seeded_store().await;

    let last_block = store.latest_block_number().await.unwrap();
    let replayer = replay_full(&store).await.unwrap();
    let snapshot = Snapshot::new(last_block, replayer.last_event_time(), replayer.into_positions());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("borrowers.json");
    snapshot.write(&path).unwrap();
    store.close().await;

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();

    assert_eq!(json["last_block_number"], 19_000_000);
    let borrowers = json["borrowers"].as_object().unwrap();
    assert_eq!(borrowers.len(), 2, "supply-only address must not appear");

    let alice = &borrowers["0xalice"];
    assert_eq!(alice["collateral"], serde_json::json!(["0xusdc"]));
    assert_eq!(alice["debt"], serde_json::json!(["0xdai", "0xusdc"]));

    let bob = &borrowers["0xbob"];
    assert_eq!(bob["collateral"], serde_json::json!(["0xwbtc"]));
    assert_eq!(bob["debt"], serde_json::json!(["0xweth"]));
}

#[tokio::test]
async fn incremental_resume_matches_full_replay() {
    let store = seeded_store().await;

    // Prior run that saw events up to t=3.
    let prior_replayer = {
        let prior_store = SqliteEventStore::in_memory().await.unwrap();
        prior_store.init_schema().await.unwrap();
        prior_store.insert_borrow("0xAlice", "0xUSDC", 1).await.unwrap();
        prior_store.insert_borrow("0xBob", "0xWETH", 2).await.unwrap();
        prior_store.insert_borrow("0xalice", "0xDAI", 3).await.unwrap();
        let replayer = replay_full(&prior_store).await.unwrap();
        prior_store.close().await;
        replayer
    };
    let prior = Snapshot::new(
        18_999_000,
        prior_replayer.last_event_time(),
        prior_replayer.into_positions(),
    );

    let resumed = replay_incremental(&store, prior).await.unwrap();
    let full = replay_full(&store).await.unwrap();
    store.close().await;

    assert_eq!(resumed.into_positions(), full.into_positions());
}
