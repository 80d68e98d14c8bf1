use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A persisted LLM cache entry. Written once, read many times; `hit_count`
/// and `last_hit_at` are tracked in memory per the v1 TTL-only eviction
/// decision (see DESIGN.md) but are still carried on the record so a future
/// LRU scheme has somewhere to live.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheRecord {
    pub id: String,
    pub exact_hash: String,
    pub vector: Vec<f32>,
    pub system_prompt: String,
    pub prompt: String,
    pub response: String,
    pub temperature: f64,
    pub model_name: String,
    pub created_at: f64,
    pub hit_count: u64,
    pub last_hit_at: Option<f64>,
    pub ttl_seconds: u64,
}

impl CacheRecord {
    /// `sha256(system_prompt ++ "\n---\n" ++ prompt)`, hex-encoded.
    pub fn compute_exact_hash(system_prompt: &str, prompt: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(system_prompt.as_bytes());
        hasher.update(b"\n---\n");
        hasher.update(prompt.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// `now - created_at < ttl_seconds`.
    pub fn is_valid_at(&self, now_epoch_seconds: f64) -> bool {
        now_epoch_seconds - self.created_at < self.ttl_seconds as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_hash_is_stable() {
        let a = CacheRecord::compute_exact_hash("sys", "prompt");
        let b = CacheRecord::compute_exact_hash("sys", "prompt");
        assert_eq!(a, b);
    }

    #[test]
    fn exact_hash_distinguishes_the_boundary() {
        // Without the "\n---\n" separator, ("sy", "s" + "prompt") could
        // collide with ("sys", "prompt"); the separator prevents that.
        let a = CacheRecord::compute_exact_hash("sy", "sprompt");
        let b = CacheRecord::compute_exact_hash("sys", "prompt");
        assert_ne!(a, b);
    }

    #[test]
    fn ttl_validity() {
        let record = CacheRecord {
            id: "id".into(),
            exact_hash: "hash".into(),
            vector: vec![],
            system_prompt: "s".into(),
            prompt: "p".into(),
            response: "r".into(),
            temperature: 0.1,
            model_name: "m".into(),
            created_at: 1000.0,
            hit_count: 0,
            last_hit_at: None,
            ttl_seconds: 60,
        };
        assert!(record.is_valid_at(1030.0));
        assert!(!record.is_valid_at(1070.0));
    }
}
