//! §4.7 Indexer: discovers, classifies, chunks, embeds, and persists source
//! files, maintaining `IndexStatus` as the single source of truth for what
//! has already been indexed.

mod scan;
mod status_io;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use deepwiki_domain::entities::{CodeChunk, FileStatusEntry, IndexStatus, SearchResult};
use deepwiki_domain::error::IndexError;
use deepwiki_domain::ports::{CodeChunker, VectorStore};
use deepwiki_domain::value_objects::{IndexerConfig, Language};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

pub use scan::scan_repository;
pub use status_io::{load_status, migrate_status, save_status};

/// `(message, current, total)`, invoked before each file processed and
/// after the final save. A panicking callback is caught and logged rather
/// than propagated, mirroring the "must not fail if the callback throws"
/// requirement.
pub type ProgressCallback<'a> = dyn Fn(&str, usize, usize) + Send + Sync + 'a;

fn report_progress(progress: Option<&ProgressCallback<'_>>, message: &str, current: usize, total: usize) {
    let Some(cb) = progress else { return };
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| cb(message, current, total)));
    if result.is_err() {
        warn!("indexer progress callback panicked, continuing");
    }
}

enum Classification {
    Unchanged(FileStatusEntry),
    Changed,
}

/// Orchestrates one repository's indexing lifecycle. Holds no domain logic
/// of its own beyond change detection — chunking and embedding are
/// delegated to the injected ports.
pub struct Indexer {
    repo_root: PathBuf,
    status_path: PathBuf,
    chunker: Arc<dyn CodeChunker>,
    vector_store: Arc<dyn VectorStore>,
    config: IndexerConfig,
}

impl Indexer {
    pub fn new(
        repo_root: impl Into<PathBuf>,
        chunker: Arc<dyn CodeChunker>,
        vector_store: Arc<dyn VectorStore>,
        config: IndexerConfig,
    ) -> Self {
        let repo_root = repo_root.into();
        let status_path = repo_root.join(".deepwiki").join("status.json");
        Indexer {
            repo_root,
            status_path,
            chunker,
            vector_store,
            config,
        }
    }

    /// Loads the persisted `IndexStatus`, if any run has completed before.
    pub async fn status(&self) -> Result<Option<IndexStatus>, IndexError> {
        load_status(&self.status_path).await
    }

    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        language: Option<Language>,
    ) -> Result<Vec<SearchResult>, IndexError> {
        self.vector_store.search(query, limit, language, None).await
    }

    /// Runs a full or incremental index pass and persists the resulting
    /// `IndexStatus`.
    pub async fn index(&self, full_rebuild: bool, progress: Option<&ProgressCallback<'_>>) -> Result<IndexStatus, IndexError> {
        let prior = load_status(&self.status_path).await?;
        let (prior, forced_full_rebuild) = migrate_status(prior)?;
        let full_rebuild = full_rebuild || forced_full_rebuild;

        let candidates = scan_repository(&self.repo_root, &self.config)?;
        let total = candidates.len();
        info!(total, full_rebuild, "starting index run");

        let mut new_files: std::collections::BTreeMap<String, FileStatusEntry> = std::collections::BTreeMap::new();
        let mut chunks_to_add: Vec<CodeChunk> = Vec::new();
        let mut seen_rel_paths: std::collections::HashSet<String> = std::collections::HashSet::new();

        for (current, abs_path) in candidates.iter().enumerate() {
            let rel_path = rel_path_string(&self.repo_root, abs_path);
            report_progress(progress, &rel_path, current, total);

            let bytes = match tokio::fs::read(abs_path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(path = %rel_path, error = %e, "failed to read file during scan, skipping");
                    continue;
                }
            };
            let sha256_hex = hex::encode(Sha256::digest(&bytes));

            let classification = if full_rebuild {
                Classification::Changed
            } else {
                match prior.files.get(&rel_path) {
                    Some(entry) if entry.sha256 == sha256_hex => Classification::Unchanged(entry.clone()),
                    _ => Classification::Changed,
                }
            };

            match classification {
                Classification::Unchanged(entry) => {
                    seen_rel_paths.insert(rel_path.clone());
                    new_files.insert(rel_path, entry);
                }
                Classification::Changed => {
                    if !full_rebuild && prior.files.contains_key(&rel_path) {
                        self.vector_store.delete_chunks_by_file(&rel_path).await?;
                    }

                    let chunker = self.chunker.clone();
                    let repo_root = self.repo_root.clone();
                    let path = abs_path.clone();
                    let chunks = tokio::task::spawn_blocking(move || chunker.chunk_file(&path, &repo_root))
                        .await
                        .map_err(|e| IndexError::Status(format!("chunking task panicked: {e}")))?
                        .map_err(|e| IndexError::Status(format!("failed to chunk {rel_path}: {e}")))?;

                    let Some(chunks) = chunks else {
                        debug!(path = %rel_path, "file extension not recognized by parser, skipping");
                        continue;
                    };

                    seen_rel_paths.insert(rel_path.clone());
                    new_files.insert(
                        rel_path.clone(),
                        FileStatusEntry {
                            sha256: sha256_hex,
                            chunk_ids: chunks.iter().map(|c| c.id.clone()).collect(),
                        },
                    );
                    chunks_to_add.extend(chunks);
                }
            }
        }

        // Deleted: present in prior status but absent from this scan.
        if !full_rebuild {
            for rel_path in prior.files.keys() {
                if !seen_rel_paths.contains(rel_path) {
                    self.vector_store.delete_chunks_by_file(rel_path).await?;
                }
            }
        }

        let total_chunks_written = if full_rebuild {
            self.vector_store.create_or_update_table(chunks_to_add).await?
        } else if !chunks_to_add.is_empty() {
            self.vector_store.add_chunks(chunks_to_add).await?
        } else {
            0
        };
        debug!(total_chunks_written, "vector store write complete");

        let stats = self.vector_store.stats().await?;
        let status = IndexStatus {
            indexed_at: now_epoch_seconds(),
            total_files: new_files.len() as u64,
            total_chunks: stats.row_count,
            schema_version: deepwiki_domain::entities::CURRENT_SCHEMA_VERSION,
            files: new_files,
        };

        save_status(&self.status_path, &status).await?;
        report_progress(progress, "index complete", total, total);
        info!(total_files = status.total_files, total_chunks = status.total_chunks, "index run complete");

        Ok(status)
    }
}

fn rel_path_string(repo_root: &Path, abs_path: &Path) -> String {
    abs_path
        .strip_prefix(repo_root)
        .unwrap_or(abs_path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn now_epoch_seconds() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
