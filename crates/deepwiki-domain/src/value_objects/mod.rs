mod chunk_type;
mod config;
mod language;
mod research;

pub use chunk_type::ChunkType;
pub use config::{ChunkingConfig, Config, DeepResearchConfig, IndexerConfig, LlmCacheConfig, WatcherConfig};
pub use language::Language;
pub use research::{ResearchProgressType, ResearchStepType, SubQuestionCategory};
