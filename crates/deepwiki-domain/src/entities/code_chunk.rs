use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::value_objects::{ChunkType, Language};

/// The closed set of extra attributes a `CodeChunk` may carry, modeled as a
/// typed struct rather than a stringly-keyed map so the compiler, not a
/// runtime key lookup, enforces the attribute list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_overview: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_summary: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method_count: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parent_classes: Vec<String>,
    #[serde(skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub parameter_types: std::collections::BTreeMap<String, String>,
    #[serde(skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub parameter_defaults: std::collections::BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub decorators: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_async: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub raises: Vec<String>,
}

/// A contiguous semantic unit of source code carrying metadata and a stable
/// identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeChunk {
    pub id: String,
    pub file_path: String,
    pub language: Language,
    pub chunk_type: ChunkType,
    pub name: String,
    pub content: String,
    pub start_line: usize,
    pub end_line: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docstring: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_name: Option<String>,
    #[serde(default)]
    pub metadata: ChunkMetadata,
}

/// Identifier used for chunks whose name could not be extracted.
pub const ANONYMOUS: &str = "anonymous";

impl CodeChunk {
    /// `sha256("{rel_path}:{name}:{start_line_0_based}")[:16]`.
    ///
    /// The 0-based line is used deliberately (not the 1-based `start_line`
    /// field) to stay compatible with previously persisted chunk IDs.
    pub fn compute_id(rel_path: &str, name: &str, start_line_0_based: usize) -> String {
        let mut hasher = Sha256::new();
        hasher.update(format!("{rel_path}:{name}:{start_line_0_based}").as_bytes());
        let digest = hasher.finalize();
        hex::encode(digest)[..16].to_string()
    }

    /// Builds a chunk, deriving its `id` from `file_path`, `name`, and the
    /// 0-based form of `start_line`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        file_path: impl Into<String>,
        language: Language,
        chunk_type: ChunkType,
        name: impl Into<String>,
        content: impl Into<String>,
        start_line: usize,
        end_line: usize,
    ) -> Self {
        let file_path = file_path.into();
        let name = name.into();
        let id = Self::compute_id(&file_path, &name, start_line.saturating_sub(1));
        CodeChunk {
            id,
            file_path,
            language,
            chunk_type,
            name,
            content: content.into(),
            start_line,
            end_line,
            docstring: None,
            parent_name: None,
            metadata: ChunkMetadata::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_deterministic_for_same_triple() {
        let a = CodeChunk::compute_id("src/foo.py", "Greeter", 0);
        let b = CodeChunk::compute_id("src/foo.py", "Greeter", 0);
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn id_changes_with_any_component() {
        let base = CodeChunk::compute_id("src/foo.py", "Greeter", 0);
        assert_ne!(base, CodeChunk::compute_id("src/bar.py", "Greeter", 0));
        assert_ne!(base, CodeChunk::compute_id("src/foo.py", "Other", 0));
        assert_ne!(base, CodeChunk::compute_id("src/foo.py", "Greeter", 1));
    }

    #[test]
    fn start_line_invariant_is_expressible() {
        let chunk = CodeChunk::new(
            "src/foo.py",
            Language::Python,
            ChunkType::Module,
            "foo",
            "content",
            1,
            10,
        );
        assert!(chunk.start_line >= 1);
        assert!(chunk.start_line <= chunk.end_line);
    }
}
