use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::value_objects::Language;

/// Snapshot of one file on disk, produced by a repository scan and
/// discarded on the next scan — it is never persisted on its own (only the
/// derived `IndexStatus` entries are).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub rel_path: String,
    pub absolute_path: PathBuf,
    pub language: Language,
    pub sha256_hex: String,
    pub size_bytes: u64,
    pub mtime: DateTime<Utc>,
}
