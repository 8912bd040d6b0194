//! Error types for the snapshot pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while building or writing a snapshot.
///
/// Every variant is fatal to the run: there is no retry policy, and a
/// failed run leaves any previous artifact in place. The external process
/// supervisor re-invokes the pipeline.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// Connectivity or query failure against the event store.
    #[error("store error: {0}")]
    Store(String),

    /// An event row violated the upstream data contract (missing or empty
    /// address/time). Treated as a data-quality failure, never skipped.
    #[error("malformed event row: {0}")]
    MalformedRow(String),

    /// Snapshot (de)serialization failed.
    #[error("snapshot serialization: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Reading a prior artifact failed.
    #[error("read snapshot {}: {}", path.display(), source)]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Writing the artifact failed. The previous artifact, if any, is intact.
    #[error("write snapshot {}: {}", path.display(), source)]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
