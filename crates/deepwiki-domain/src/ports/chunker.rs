use std::path::Path;

use crate::entities::CodeChunk;
use crate::error::ParserError;
use crate::value_objects::Language;

/// Turns a parsed file into the lazy (here: materialized) sequence of
/// `CodeChunk`s described by the emission order: Module, then Import, then
/// Classes in pre-order, then top-level Functions. Implemented once in
/// `deepwiki-infrastructure`; exposed as a port so the application layer
/// never depends on tree-sitter directly.
pub trait CodeChunker: Send + Sync {
    /// Reads `path` relative to `repo_root`, detects its language, and
    /// chunks it. Returns `Ok(None)` when the extension is not recognized
    /// (mirrors `Parser::parse_file`'s "absent" result rather than an
    /// error, since an unsupported file is not a failure).
    fn chunk_file(&self, path: &Path, repo_root: &Path) -> Result<Option<Vec<CodeChunk>>, ParserError>;

    /// Chunks already-read file content whose language is already known.
    fn chunk_content(
        &self,
        content: &[u8],
        language: Language,
        rel_path: &str,
    ) -> Result<Vec<CodeChunk>, ParserError>;

    /// Chunks every file in `paths`, skipping unsupported extensions.
    fn chunk_batch(&self, paths: &[(std::path::PathBuf, std::path::PathBuf)]) -> Vec<CodeChunk> {
        paths
            .iter()
            .filter_map(|(path, repo_root)| self.chunk_file(path, repo_root).ok().flatten())
            .flatten()
            .collect()
    }

    fn supported_languages(&self) -> &[Language];
}
