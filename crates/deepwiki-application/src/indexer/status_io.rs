//! Persistence for `IndexStatus`: write-then-rename for atomicity (§5,
//! "single writer, write-then-rename"), plus the schema migration check
//! described in §4.7.

use std::path::Path;

use deepwiki_domain::entities::{IndexStatus, CURRENT_SCHEMA_VERSION};
use deepwiki_domain::error::IndexError;

/// Loads `status.json` if present. A missing file is not an error — it
/// means no run has ever completed.
pub async fn load_status(path: &Path) -> Result<Option<IndexStatus>, IndexError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            let status: IndexStatus =
                serde_json::from_slice(&bytes).map_err(|e| IndexError::Status(format!("corrupt status file: {e}")))?;
            Ok(Some(status))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(IndexError::Status(format!("failed to read status file: {e}"))),
    }
}

/// `_needs_migration` / `_migrate_status`: returns the status to run this
/// pass against and whether the schema gap forces a full rebuild. An
/// absent status (first run ever) is treated the same way, since the
/// vector store table itself still needs to be created.
///
/// §7 `SchemaTooNew`: a status file whose `schema_version` is newer than
/// `CURRENT_SCHEMA_VERSION` means this binary is older than the store that
/// wrote it; refuse to run rather than silently reinterpreting a layout we
/// don't understand.
pub fn migrate_status(prior: Option<IndexStatus>) -> Result<(IndexStatus, bool), IndexError> {
    match prior {
        None => Ok((IndexStatus::empty(), true)),
        Some(status) if status.schema_version > CURRENT_SCHEMA_VERSION => Err(IndexError::SchemaTooNew {
            found: status.schema_version,
            supported: CURRENT_SCHEMA_VERSION,
        }),
        Some(mut status) if status.needs_migration() => {
            status.schema_version = CURRENT_SCHEMA_VERSION;
            Ok((status, true))
        }
        Some(status) => Ok((status, false)),
    }
}

/// Serializes `status` and writes it to `path` via a temporary file plus
/// rename, so a reader never observes a partially written file.
pub async fn save_status(path: &Path, status: &IndexStatus) -> Result<(), IndexError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| IndexError::Status(format!("failed to create status directory: {e}")))?;
    }

    let serialized =
        serde_json::to_vec_pretty(status).map_err(|e| IndexError::Status(format!("failed to serialize status: {e}")))?;

    let tmp_path = path.with_extension("json.tmp");
    tokio::fs::write(&tmp_path, &serialized)
        .await
        .map_err(|e| IndexError::Status(format!("failed to write status file: {e}")))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| IndexError::Status(format!("failed to rename status file into place: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn missing_status_file_loads_as_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("status.json");
        assert!(load_status(&path).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn round_trips_through_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".deepwiki").join("status.json");
        let mut status = IndexStatus::empty();
        status.total_files = 2;

        save_status(&path, &status).await.unwrap();
        let restored = load_status(&path).await.unwrap().unwrap();

        assert_eq!(restored, status);
    }

    #[test]
    fn absent_status_forces_full_rebuild() {
        let (status, forced) = migrate_status(None).unwrap();
        assert!(forced);
        assert_eq!(status.schema_version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn stale_schema_forces_full_rebuild() {
        let mut old = IndexStatus::empty();
        old.schema_version = 0;
        let (status, forced) = migrate_status(Some(old)).unwrap();
        assert!(forced);
        assert_eq!(status.schema_version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn current_schema_does_not_force_rebuild() {
        let status = IndexStatus::empty();
        let (_, forced) = migrate_status(Some(status)).unwrap();
        assert!(!forced);
    }

    #[test]
    fn newer_than_supported_schema_refuses_to_run() {
        let mut future = IndexStatus::empty();
        future.schema_version = CURRENT_SCHEMA_VERSION + 1;
        let err = migrate_status(Some(future)).unwrap_err();
        match err {
            IndexError::SchemaTooNew { found, supported } => {
                assert_eq!(found, CURRENT_SCHEMA_VERSION + 1);
                assert_eq!(supported, CURRENT_SCHEMA_VERSION);
            }
            other => panic!("expected SchemaTooNew, got {other:?}"),
        }
    }
}
