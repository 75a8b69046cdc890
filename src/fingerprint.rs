//! Cache keys for remote files and whole-folder snapshots.
//!
//! A file fingerprint is the pipe-joined listing metadata of one file; the
//! snapshot fingerprint is a SHA-256 digest over every file fingerprint of a
//! listing. Both are invalidation tokens, not integrity checks.

use crate::models::RemoteFileRecord;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Identity/version key of one remote file
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileFingerprint(String);

impl FileFingerprint {
    pub fn of(record: &RemoteFileRecord) -> Self {
        Self(format!(
            "{}|{}|{}|{}|{}",
            record.name, record.address, record.change_tag, record.modified_at, record.size_bytes
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FileFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Digest of a whole remote listing
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotFingerprint(String);

impl SnapshotFingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, for log lines
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(12)]
    }
}

impl fmt::Display for SnapshotFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Fold a listing into one digest, in the order given
///
/// Callers pass the listing as returned by the lister, which is already
/// sorted, so the raw order of the server response does not matter.
pub fn snapshot_fingerprint(records: &[RemoteFileRecord]) -> SnapshotFingerprint {
    let joined = records
        .iter()
        .map(|record| FileFingerprint::of(record).0)
        .collect::<Vec<_>>()
        .join("\n");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    SnapshotFingerprint(format!("{:x}", hasher.finalize()))
}
