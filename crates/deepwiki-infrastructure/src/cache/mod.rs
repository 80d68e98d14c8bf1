mod duckdb_store;
mod llm_cache;

pub use duckdb_store::DuckDbCacheStore;
pub use llm_cache::LlmCache;
