use async_trait::async_trait;

use crate::error::CacheError;

/// Aggregate counters tracked by the LLM cache for observability and for
/// the testable properties around hit rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub skipped: u64,
}

/// Durable backing store for the LLM cache's two-path lookup (exact hash,
/// then embedding similarity). The in-process front cache and the
/// hash/similarity decision logic live in `deepwiki-infrastructure`; this
/// port is the persistence seam so that layer never touches DuckDB types
/// directly.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Scalar-equality lookup on `exact_hash`. Returns the stored response
    /// and its metadata needed to validate TTL, without the caller needing
    /// to know the storage shape.
    async fn lookup_exact(&self, exact_hash: &str) -> Result<Option<CacheLookup>, CacheError>;

    /// ANN search over cached prompt embeddings, most similar first.
    async fn search_similar(&self, vector: &[f32], limit: usize) -> Result<Vec<CacheLookup>, CacheError>;

    async fn insert(&self, record: crate::entities::CacheRecord) -> Result<(), CacheError>;

    /// Deletes every record whose TTL has expired, at most `limit` per call.
    async fn evict_expired(&self, now_epoch_seconds: f64, limit: usize) -> Result<u64, CacheError>;

    async fn row_count(&self) -> Result<u64, CacheError>;

    async fn clear(&self) -> Result<(), CacheError>;
}

/// Result of a cache-store lookup: enough of the record to validate TTL,
/// model identity, and similarity, plus the cached response itself.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheLookup {
    pub id: String,
    pub response: String,
    pub model_name: String,
    pub created_at: f64,
    pub ttl_seconds: u64,
    /// `1 - distance` for similarity-path results; `1.0` for exact-path hits.
    pub similarity: f64,
}
