use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Current on-disk schema version for `IndexStatus` and the vector table
/// layout. Bumping this forces `migrate_status` to run on next load.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Per-file bookkeeping kept inside `IndexStatus` so an incremental run can
/// tell which chunks belong to which file without re-scanning the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileStatusEntry {
    pub sha256: String,
    pub chunk_ids: Vec<String>,
}

/// Persisted record of the last successful index run. Owned by the Indexer;
/// rewritten after every run, write-then-rename for atomicity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStatus {
    /// Seconds since the Unix epoch, matching the wire shape in the
    /// filesystem layout contract.
    pub indexed_at: f64,
    pub total_files: u64,
    pub total_chunks: u64,
    pub schema_version: u32,
    pub files: BTreeMap<String, FileStatusEntry>,
}

impl IndexStatus {
    pub fn empty() -> Self {
        IndexStatus {
            indexed_at: 0.0,
            total_files: 0,
            total_chunks: 0,
            schema_version: CURRENT_SCHEMA_VERSION,
            files: BTreeMap::new(),
        }
    }

    /// `status.schema_version < CURRENT_SCHEMA_VERSION`.
    pub fn needs_migration(&self) -> bool {
        self.schema_version < CURRENT_SCHEMA_VERSION
    }
}

impl Default for IndexStatus {
    fn default() -> Self {
        Self::empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_status_does_not_need_migration() {
        assert!(!IndexStatus::empty().needs_migration());
    }

    #[test]
    fn older_schema_needs_migration() {
        let mut status = IndexStatus::empty();
        status.schema_version = 0;
        assert!(status.needs_migration());
    }

    #[test]
    fn round_trips_through_json() {
        let mut status = IndexStatus::empty();
        status.total_files = 3;
        status.files.insert(
            "src/a.py".to_string(),
            FileStatusEntry {
                sha256: "deadbeef".to_string(),
                chunk_ids: vec!["abc123".to_string()],
            },
        );
        let json = serde_json::to_string(&status).unwrap();
        let restored: IndexStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(status, restored);
    }
}
