//! Public facade over the deepwiki core: wires the domain ports to concrete
//! infrastructure and provider implementations and exposes the consumer
//! interfaces named in §6 — `index`, `search`, `ask`, `get_chunk_by_id`,
//! `get_chunks_by_file`, `stats` — as one `Workspace` handle. MCP transport,
//! the web UI, and wiki generation build on top of this crate; none of them
//! live here.

mod providers;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use deepwiki_application::{Indexer, ProgressCallback, ResearchPipeline, WatcherOrchestrator};
pub use deepwiki_application::{CancelPredicate, ProgressHook};
use deepwiki_domain::entities::{CodeChunk, DeepResearchResult, IndexStatus, SearchResult};
use deepwiki_domain::error::{Error, IndexError, ResearchError};
use deepwiki_domain::ports::{CodeChunker, EmbeddingProvider, VectorStore, VectorStoreStats};
use deepwiki_domain::value_objects::{Config, Language};
use deepwiki_infrastructure::chunker::TreeSitterChunker;
use deepwiki_infrastructure::vector_store::DuckDbVectorStore;
use deepwiki_infrastructure::watcher::NotifyFileSystemWatcher;

pub use providers::{EmbeddingBackend, LlmBackend, WorkspaceBuilder};

/// A fully wired deepwiki instance over one repository root. Construct one
/// with [`WorkspaceBuilder`].
pub struct Workspace {
    repo_root: PathBuf,
    indexer: Arc<Indexer>,
    research: ResearchPipeline,
    vector_store: Arc<dyn VectorStore>,
    watcher: WatcherOrchestrator,
}

impl Workspace {
    pub(crate) fn new(
        repo_root: PathBuf,
        indexer: Arc<Indexer>,
        research: ResearchPipeline,
        vector_store: Arc<dyn VectorStore>,
        watcher: WatcherOrchestrator,
    ) -> Self {
        Workspace { repo_root, indexer, research, vector_store, watcher }
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Runs a full or incremental index pass and persists the resulting
    /// `IndexStatus`.
    pub async fn index(&self, full_rebuild: bool, progress: Option<&ProgressCallback<'_>>) -> Result<IndexStatus, IndexError> {
        self.indexer.index(full_rebuild, progress).await
    }

    /// The most recently persisted `IndexStatus`, if any run has completed.
    pub async fn status(&self) -> Result<Option<IndexStatus>, IndexError> {
        self.indexer.status().await
    }

    pub async fn search(&self, query: &str, limit: usize, language: Option<Language>) -> Result<Vec<SearchResult>, IndexError> {
        self.indexer.search(query, limit, language).await
    }

    /// Runs the Deep Research pipeline end to end for one question.
    pub async fn ask(
        &self,
        question: &str,
        progress: Option<&ProgressHook>,
        cancel: Option<&CancelPredicate>,
    ) -> Result<DeepResearchResult, ResearchError> {
        self.research.ask(question, progress, cancel).await
    }

    pub async fn get_chunk_by_id(&self, id: &str) -> Result<Option<CodeChunk>, IndexError> {
        self.vector_store.get_chunk_by_id(id).await
    }

    pub async fn get_chunks_by_file(&self, rel_path: &str) -> Result<Vec<CodeChunk>, IndexError> {
        self.vector_store.get_chunks_by_file(rel_path).await
    }

    pub async fn stats(&self) -> Result<VectorStoreStats, IndexError> {
        self.vector_store.stats().await
    }

    /// Watches the repository root and drives debounced incremental index
    /// runs until the underlying watcher ends. Runs until cancelled by the
    /// caller (e.g. via `tokio::select!` against a shutdown signal) — the
    /// `notify`-backed watcher itself has no stop switch exposed here.
    pub async fn watch(&self, post_index: Option<&deepwiki_application::watcher::PostIndexHook>) -> Result<(), IndexError> {
        self.watcher.run(post_index).await
    }
}

/// Builds the chunker + vector store pair shared between indexing and
/// direct chunk construction (e.g. a CLI `chunk` subcommand that bypasses
/// the vector store entirely). Exposed for callers that want the chunking
/// pipeline without a full `Workspace`.
pub fn build_chunker(config: &Config) -> Arc<dyn CodeChunker> {
    Arc::new(TreeSitterChunker::new(config.chunking.class_split_threshold))
}

pub(crate) fn default_vector_store_path(repo_root: &Path) -> PathBuf {
    repo_root.join(".deepwiki").join("vectors").join("chunks.duckdb")
}

pub(crate) fn default_cache_store_path(repo_root: &Path) -> PathBuf {
    repo_root.join(".deepwiki").join("llm_cache").join("cache.duckdb")
}

pub(crate) fn open_vector_store(path: &Path, embedder: Arc<dyn EmbeddingProvider>) -> Result<DuckDbVectorStore, Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(Error::Io)?;
    }
    DuckDbVectorStore::open(path, embedder).map_err(Error::from)
}

pub(crate) fn build_watcher() -> Arc<NotifyFileSystemWatcher> {
    Arc::new(NotifyFileSystemWatcher::new())
}
