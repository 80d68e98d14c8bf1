//! Infrastructure layer: parser, chunker, vector store, LLM cache, config,
//! logging, and file watcher. Implements the domain's ports; never imported
//! by `deepwiki-domain` itself.

pub mod cache;
pub mod chunker;
pub mod config;
pub mod logging;
pub mod parser;
pub mod sanitize;
pub mod vector_store;
pub mod watcher;
