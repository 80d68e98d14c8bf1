//! §4.1 Parser: tree-sitter grammars for the closed `Language` set, a
//! memoized per-thread parser cache, and the AST utility contracts
//! (`node_text`, `find_by_type`, `node_name`, `docstring`) the Chunker
//! builds on.

mod ast;
mod dialect;
mod registry;

pub use ast::{enclosing_class, file_info, find_by_type, node_text};
pub use dialect::{dialect_for, LanguageDialect};
pub use registry::Parsers;

use std::path::Path;

use deepwiki_domain::error::ParserError;
use deepwiki_domain::value_objects::Language;
use tree_sitter::Tree;

/// `parse_file(path) -> (AST, Language, bytes)?`: reads the file once and
/// returns absent when the extension is unknown, mirroring the
/// `CodeChunker::chunk_file` contract it backs.
pub fn parse_file(parsers: &Parsers, path: &Path) -> Result<Option<(Tree, Language, Vec<u8>)>, ParserError> {
    let Some(language) = parsers.detect_language(path) else {
        return Ok(None);
    };
    let bytes = std::fs::read(path).map_err(|e| ParserError::ParseFailure {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    let tree = parsers.parse(&bytes, language)?;
    Ok(Some((tree, language, bytes)))
}
