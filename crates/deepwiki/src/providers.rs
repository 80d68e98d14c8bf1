//! Concrete provider selection. MCP/CLI layers pick one `EmbeddingBackend`
//! and one `LlmBackend` at startup; everything downstream only ever sees
//! the domain's `EmbeddingProvider`/`LlmProvider` traits.

use std::path::PathBuf;
use std::sync::Arc;

use deepwiki_application::{Indexer, ResearchPipeline};
use deepwiki_domain::error::Error;
use deepwiki_domain::ports::{EmbeddingProvider, LlmProvider};
use deepwiki_domain::value_objects::Config;
use deepwiki_infrastructure::cache::{DuckDbCacheStore, LlmCache};
use deepwiki_providers::{
    AnthropicLlmProvider, FastEmbedProvider, OllamaEmbeddingProvider, OllamaLlmProvider,
    OpenAiCompatibleEmbeddingProvider, OpenAiCompatibleLlmProvider,
};
use reqwest::Client;

use crate::{build_chunker, build_watcher, default_cache_store_path, default_vector_store_path, open_vector_store, Workspace};

/// Which embedding backend to construct. Mirrors §4.4: one local (CPU
/// sentence-transformer via `fastembed`) and remote, network-fetched
/// alternatives.
pub enum EmbeddingBackend {
    /// Local ONNX sentence-transformer; no network calls.
    Local,
    Ollama { base_url: String, model: String, dimension: usize },
    OpenAi { api_key: String, base_url: Option<String>, model: String, dimension: usize },
}

/// Which LLM backend to construct. Mirrors §4.5/§6.
pub enum LlmBackend {
    Ollama { base_url: String, model: String },
    OpenAi { api_key: String, base_url: Option<String>, model: String },
    Anthropic { api_key: String, base_url: Option<String>, model: String },
}

fn build_embedder(backend: EmbeddingBackend) -> Result<Arc<dyn EmbeddingProvider>, Error> {
    let http_client = Client::new();
    let embedder: Arc<dyn EmbeddingProvider> = match backend {
        EmbeddingBackend::Local => Arc::new(FastEmbedProvider::try_new()?),
        EmbeddingBackend::Ollama { base_url, model, dimension } => {
            Arc::new(OllamaEmbeddingProvider::new(base_url, model, dimension, http_client))
        }
        EmbeddingBackend::OpenAi { api_key, base_url, model, dimension } => {
            Arc::new(OpenAiCompatibleEmbeddingProvider::new(api_key, base_url, model, dimension, http_client))
        }
    };
    Ok(embedder)
}

fn build_llm(backend: LlmBackend) -> Arc<dyn LlmProvider> {
    let http_client = Client::new();
    match backend {
        LlmBackend::Ollama { base_url, model } => Arc::new(OllamaLlmProvider::new(base_url, model, http_client)),
        LlmBackend::OpenAi { api_key, base_url, model } => {
            Arc::new(OpenAiCompatibleLlmProvider::new(api_key, base_url, model, http_client))
        }
        LlmBackend::Anthropic { api_key, base_url, model } => {
            Arc::new(AnthropicLlmProvider::new(api_key, base_url, model, http_client))
        }
    }
}

/// Wires a repository root, a `Config`, and a pair of provider backends
/// into one fully constructed [`Workspace`].
pub struct WorkspaceBuilder {
    repo_root: PathBuf,
    config: Config,
    embedding: EmbeddingBackend,
    llm: LlmBackend,
}

impl WorkspaceBuilder {
    pub fn new(repo_root: impl Into<PathBuf>, embedding: EmbeddingBackend, llm: LlmBackend) -> Self {
        WorkspaceBuilder {
            repo_root: repo_root.into(),
            config: Config::default(),
            embedding,
            llm,
        }
    }

    pub fn with_config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Workspace, Error> {
        let repo_root = self.repo_root;
        let embedder = build_embedder(self.embedding)?;
        let dimension = embedder.dimension();

        let vector_store: Arc<dyn deepwiki_domain::ports::VectorStore> =
            Arc::new(open_vector_store(&default_vector_store_path(&repo_root), embedder.clone())?);

        let cache_store_path = default_cache_store_path(&repo_root);
        if let Some(parent) = cache_store_path.parent() {
            std::fs::create_dir_all(parent).map_err(Error::Io)?;
        }
        let cache_store = Arc::new(DuckDbCacheStore::open(&cache_store_path, dimension)?);

        let raw_llm = build_llm(self.llm);
        let cached_llm: Arc<dyn LlmProvider> =
            Arc::new(LlmCache::new(raw_llm, cache_store, embedder.clone(), self.config.llm_cache.clone()));

        let chunker = build_chunker(&self.config);
        let indexer = Arc::new(Indexer::new(repo_root.clone(), chunker, vector_store.clone(), self.config.indexer.clone()));
        let research = ResearchPipeline::new(cached_llm, vector_store.clone(), self.config.deep_research.clone());

        let watcher_port = build_watcher();
        let watcher = deepwiki_application::WatcherOrchestrator::new(
            repo_root.clone(),
            indexer.clone(),
            watcher_port,
            self.config.watcher.clone(),
            &self.config.indexer,
        )?;

        Ok(Workspace::new(repo_root, indexer, research, vector_store, watcher))
    }
}
