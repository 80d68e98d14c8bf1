mod duckdb_store;
mod embed_text;

pub use duckdb_store::DuckDbVectorStore;
pub use embed_text::embed_text;
