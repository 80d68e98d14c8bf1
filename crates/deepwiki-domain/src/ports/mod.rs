mod cache;
mod chunker;
mod embedding;
mod llm;
mod vector_store;
mod watcher;

pub use cache::{CacheLookup, CacheStats, CacheStore};
pub use chunker::CodeChunker;
pub use embedding::EmbeddingProvider;
pub use llm::{GenerateStream, LlmProvider};
pub use vector_store::{VectorStore, VectorStoreStats};
pub use watcher::{FileSystemWatcher, RawEventKind, RawEventStream, RawFileEvent};
