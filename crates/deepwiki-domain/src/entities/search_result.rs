use serde::{Deserialize, Serialize};

use super::code_chunk::CodeChunk;

/// One ranked hit from a vector store search. `score = 1 - distance`,
/// clamped to `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: CodeChunk,
    pub score: f64,
}

impl SearchResult {
    pub fn from_distance(chunk: CodeChunk, distance: f64) -> Self {
        let score = (1.0 - distance).clamp(0.0, 1.0);
        SearchResult { chunk, score }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::{ChunkType, Language};

    fn sample_chunk() -> CodeChunk {
        CodeChunk::new(
            "src/a.py",
            Language::Python,
            ChunkType::Function,
            "foo",
            "def foo(): pass",
            1,
            1,
        )
    }

    #[test]
    fn score_is_clamped_to_unit_interval() {
        assert_eq!(SearchResult::from_distance(sample_chunk(), -0.5).score, 1.0);
        assert_eq!(SearchResult::from_distance(sample_chunk(), 1.5).score, 0.0);
        assert!((SearchResult::from_distance(sample_chunk(), 0.25).score - 0.75).abs() < 1e-9);
    }
}
