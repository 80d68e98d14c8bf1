//! Static configuration. Every configurable bound named in the external
//! interface section is an explicit typed field here with the documented
//! default, rather than a string-keyed lookup at call sites.

use serde::{Deserialize, Serialize};

/// Top-level configuration for a deepwiki workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub chunking: ChunkingConfig,
    pub llm_cache: LlmCacheConfig,
    pub deep_research: DeepResearchConfig,
    pub watcher: WatcherConfig,
    pub indexer: IndexerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            chunking: ChunkingConfig::default(),
            llm_cache: LlmCacheConfig::default(),
            deep_research: DeepResearchConfig::default(),
            watcher: WatcherConfig::default(),
            indexer: IndexerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// A class is split into a summary + per-method chunks once its line
    /// count exceeds this threshold; below it, the class is emitted whole.
    pub class_split_threshold: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        ChunkingConfig {
            class_split_threshold: 200,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmCacheConfig {
    pub ttl_seconds: u64,
    pub max_entries: u64,
    pub similarity_threshold: f64,
    pub max_cacheable_temperature: f64,
}

impl Default for LlmCacheConfig {
    fn default() -> Self {
        LlmCacheConfig {
            ttl_seconds: 86_400,
            max_entries: 10_000,
            similarity_threshold: 0.95,
            max_cacheable_temperature: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeepResearchConfig {
    pub max_sub_questions: usize,
    pub chunks_per_subquestion: usize,
    pub max_total_chunks: usize,
    pub max_follow_up_queries: usize,
    pub synthesis_temperature: f64,
    pub synthesis_max_tokens: u32,
}

impl Default for DeepResearchConfig {
    fn default() -> Self {
        DeepResearchConfig {
            max_sub_questions: 4,
            chunks_per_subquestion: 5,
            max_total_chunks: 30,
            max_follow_up_queries: 3,
            synthesis_temperature: 0.5,
            synthesis_max_tokens: 4096,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    pub debounce_seconds: u64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        WatcherConfig { debounce_seconds: 2 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        IndexerConfig {
            include: vec!["**/*".to_string()],
            exclude: vec![
                "**/.git/**".to_string(),
                "**/.deepwiki/**".to_string(),
                "**/node_modules/**".to_string(),
                "**/target/**".to_string(),
                "**/vendor/**".to_string(),
                "**/dist/**".to_string(),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_values() {
        let cfg = Config::default();
        assert_eq!(cfg.chunking.class_split_threshold, 200);
        assert_eq!(cfg.deep_research.max_sub_questions, 4);
        assert_eq!(cfg.deep_research.chunks_per_subquestion, 5);
        assert_eq!(cfg.deep_research.max_total_chunks, 30);
        assert_eq!(cfg.deep_research.max_follow_up_queries, 3);
        assert!((cfg.deep_research.synthesis_temperature - 0.5).abs() < f64::EPSILON);
        assert_eq!(cfg.deep_research.synthesis_max_tokens, 4096);
    }

    #[test]
    fn round_trips_through_toml() {
        let cfg = Config::default();
        let serialized = toml::to_string(&cfg).expect("serialize");
        let restored: Config = toml::from_str(&serialized).expect("deserialize");
        assert_eq!(cfg, restored);
    }
}
