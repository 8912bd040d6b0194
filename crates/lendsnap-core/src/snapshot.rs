//! The snapshot artifact — the materialized borrower-position mapping plus
//! checkpoint metadata, serialized to a single JSON file.
//!
//! A snapshot's lifecycle is: computed in memory, written to storage,
//! superseded by the next run's snapshot. The write is atomic (temp file +
//! rename), so a crash mid-write leaves the previous artifact untouched.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::error::SnapshotError;
use crate::types::BorrowerPosition;

/// Default artifact filename, relative to the working directory.
pub const DEFAULT_SNAPSHOT_FILE: &str = "borrowers.json";

/// The serialized borrower-position mapping at a point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Highest block number the upstream indexer reported as indexed.
    /// Descriptive metadata for the consumer, not a replay bound.
    pub last_block_number: u64,
    /// Highest borrow-event `time` folded into `borrowers`; the resume
    /// cutoff for incremental runs. Absent in artifacts written before
    /// this field existed, hence the default.
    #[serde(default)]
    pub last_event_time: i64,
    /// One entry per distinct borrower, keyed by normalized address.
    pub borrowers: BTreeMap<Address, BorrowerPosition>,
}

impl Snapshot {
    pub fn new(
        last_block_number: u64,
        last_event_time: i64,
        borrowers: BTreeMap<Address, BorrowerPosition>,
    ) -> Self {
        Self {
            last_block_number,
            last_event_time,
            borrowers,
        }
    }

    /// Load a prior artifact (incremental resume).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let path = path.as_ref();
        let bytes = fs::read(path).map_err(|source| SnapshotError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Serialize to pretty-printed JSON (the consumer's on-disk form).
    pub fn to_json(&self) -> Result<String, SnapshotError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the artifact atomically.
    ///
    /// Serializes to `<path>.tmp` in the destination directory, then
    /// renames over `path`. The rename stays on one filesystem, so the
    /// destination is always either the previous artifact or the new one,
    /// never a partial write.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<(), SnapshotError> {
        let path = path.as_ref();
        let json = self.to_json()?;

        let tmp = tmp_path(path);
        fs::write(&tmp, json.as_bytes()).map_err(|source| SnapshotError::Write {
            path: tmp.clone(),
            source,
        })?;

        fs::rename(&tmp, path).map_err(|source| {
            let _ = fs::remove_file(&tmp);
            SnapshotError::Write {
                path: path.to_path_buf(),
                source,
            }
        })
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".tmp");
    PathBuf::from(os)
}
