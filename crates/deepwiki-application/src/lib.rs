//! Application layer: orchestrates the Indexer, Research Pipeline, and
//! Watcher use cases over the domain's port traits. No dependency on any
//! concrete provider or infrastructure crate — only `deepwiki-domain`.

pub mod indexer;
pub mod research;
pub mod watcher;

pub use indexer::{Indexer, ProgressCallback};
pub use research::{CancelPredicate, ProgressHook, ResearchPipeline};
pub use watcher::WatcherOrchestrator;
