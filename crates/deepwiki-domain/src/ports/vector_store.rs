use async_trait::async_trait;

use crate::entities::{CodeChunk, SearchResult};
use crate::error::IndexError;
use crate::value_objects::{ChunkType, Language};

/// Aggregate counters returned by `VectorStore::stats`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VectorStoreStats {
    pub row_count: u64,
    pub unique_files: u64,
}

/// Durable vector + scalar record storage: ANN search, scalar filters, and
/// point lookups over one table per repository.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embeds every chunk's text, writes the full set, then ensures scalar
    /// indexes exist. Returns the number of chunks written.
    async fn create_or_update_table(&self, chunks: Vec<CodeChunk>) -> Result<usize, IndexError>;

    /// Embeds and appends `chunks`. Does not deduplicate IDs; the caller
    /// (the Indexer) is responsible for not re-adding chunks whose file was
    /// not first cleared.
    async fn add_chunks(&self, chunks: Vec<CodeChunk>) -> Result<usize, IndexError>;

    /// Embeds `query`, runs an ANN search for the top `limit` matches, and
    /// applies `language`/`chunk_type` scalar filters. Results are sorted by
    /// score descending.
    async fn search(
        &self,
        query: &str,
        limit: usize,
        language: Option<Language>,
        chunk_type: Option<ChunkType>,
    ) -> Result<Vec<SearchResult>, IndexError>;

    async fn get_chunk_by_id(&self, id: &str) -> Result<Option<CodeChunk>, IndexError>;

    async fn get_chunks_by_file(&self, rel_path: &str) -> Result<Vec<CodeChunk>, IndexError>;

    /// Deletes every chunk belonging to `rel_path`, returning the count
    /// removed.
    async fn delete_chunks_by_file(&self, rel_path: &str) -> Result<usize, IndexError>;

    async fn stats(&self) -> Result<VectorStoreStats, IndexError>;
}
