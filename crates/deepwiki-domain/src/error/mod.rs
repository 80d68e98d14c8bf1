//! Per-subsystem error taxonomy.
//!
//! Each subsystem gets its own `thiserror` enum instead of one flat error
//! type, so callers at a module boundary can match on the specific failure
//! shape (e.g. the research pipeline matching `ResearchError::Cancelled`).
//! `Error` aggregates all of them for callers that just want one type.

use thiserror::Error as ThisError;

/// Failures raised by the parser while turning source bytes into an AST.
#[derive(Debug, ThisError)]
pub enum ParserError {
    #[error("unsupported file: {path}")]
    UnsupportedFile { path: String },

    #[error("failed to parse {path}: {message}")]
    ParseFailure { path: String, message: String },
}

/// Failures shared by embedding and LLM providers.
#[derive(Debug, ThisError)]
pub enum ProviderError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("model not found, available models: {available:?}")]
    ModelNotFound { available: Vec<String> },

    #[error("invocation failed: {0}")]
    Invocation(String),

    #[error("cancelled")]
    Cancelled,

    #[error("rate limited, retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },
}

/// Failures internal to the LLM cache. These never escape the cache's
/// public API: a `CacheError` is always converted into a miss by the caller.
#[derive(Debug, ThisError)]
pub enum CacheError {
    #[error("cache corruption: {0}")]
    Corruption(String),

    #[error("cache backend error: {0}")]
    Backend(String),
}

/// Failures raised by the vector store and the indexer that wraps it.
#[derive(Debug, ThisError)]
pub enum IndexError {
    #[error("vector store io error: {0}")]
    VectorStoreIo(String),

    #[error("status schema version {found} is newer than the supported version {supported}")]
    SchemaTooNew { found: u32, supported: u32 },

    #[error("index status error: {0}")]
    Status(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Failures raised by the deep research pipeline.
#[derive(Debug, ThisError)]
pub enum ResearchError {
    /// Cooperative cancellation took effect at the named state.
    #[error("research cancelled at step {step}")]
    Cancelled { step: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("vector store error: {0}")]
    VectorStore(String),
}

/// Aggregate error type for callers (the CLI, the facade crate) that want a
/// single `Result` alias instead of matching each subsystem individually.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    Parser(#[from] ParserError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Research(#[from] ResearchError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl From<&str> for Error {
    fn from(value: &str) -> Self {
        Error::Other(value.to_string())
    }
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error::Other(value)
    }
}

/// Convenience alias used throughout the domain and its dependents.
pub type Result<T, E = Error> = std::result::Result<T, E>;
