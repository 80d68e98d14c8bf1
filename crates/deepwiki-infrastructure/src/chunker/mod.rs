//! §4.2 Chunker: turns a parsed file into the emission sequence Module →
//! Import → Classes (pre-order) → top-level Functions.

mod metadata;

pub use metadata::{metadata_for, LanguageMetadata};

use std::path::{Path, PathBuf};

use deepwiki_domain::entities::{ChunkMetadata, CodeChunk, ANONYMOUS};
use deepwiki_domain::error::ParserError;
use deepwiki_domain::value_objects::{ChunkType, Language};
use deepwiki_domain::CodeChunker as CodeChunkerPort;
use tree_sitter::Node;

use crate::parser::{dialect_for, enclosing_class, find_by_type, node_text, parse_file, Parsers};

const MAX_SUMMARY_IMPORTS: usize = 10;

/// Real tree-sitter-backed implementation of the `CodeChunker` port.
pub struct TreeSitterChunker {
    parsers: Parsers,
    class_split_threshold: usize,
}

impl TreeSitterChunker {
    pub fn new(class_split_threshold: usize) -> Self {
        TreeSitterChunker {
            parsers: Parsers::new(),
            class_split_threshold,
        }
    }

    fn is_import_node(language: Language, node: Node, source: &[u8]) -> bool {
        if language != Language::Ruby {
            return true;
        }
        // Ruby's import kind is the generic `call` node; only `require`/
        // `require_relative` calls count as imports.
        let Some(method) = node.child_by_field_name("method") else {
            return false;
        };
        matches!(node_text(method, source).as_ref(), "require" | "require_relative")
    }

    fn top_level_imports<'tree>(
        &self,
        root: Node<'tree>,
        language: Language,
        source: &[u8],
    ) -> Vec<Node<'tree>> {
        let kinds = language.import_node_kinds();
        let mut cursor = root.walk();
        root.children(&mut cursor)
            .filter(|c| kinds.contains(&c.kind()) && Self::is_import_node(language, *c, source))
            .collect()
    }

    fn build_module_chunk(
        &self,
        root: Node,
        language: Language,
        source: &[u8],
        rel_path: &str,
        imports: &[Node],
        classes: &[(Node, String)],
        top_level_functions: &[(Node, String)],
        line_count: usize,
    ) -> CodeChunk {
        let stem = Path::new(rel_path)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| rel_path.to_string());

        let mut content = String::from("# Imports:\n");
        for (i, import) in imports.iter().take(MAX_SUMMARY_IMPORTS).enumerate() {
            if i > 0 {
                content.push('\n');
            }
            content.push_str(node_text(*import, source).trim());
        }
        if imports.len() > MAX_SUMMARY_IMPORTS {
            content.push_str(&format!("\n... and {} more", imports.len() - MAX_SUMMARY_IMPORTS));
        }

        content.push_str("\n# Classes: ");
        content.push_str(&classes.iter().map(|(_, name)| name.as_str()).collect::<Vec<_>>().join(", "));

        content.push_str("\n# Functions: ");
        content.push_str(
            &top_level_functions
                .iter()
                .map(|(_, name)| name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        );

        let mut chunk = CodeChunk::new(rel_path, language, ChunkType::Module, stem, content, 1, line_count.max(1));
        chunk.docstring = dialect_for(language).module_docstring(root, source);
        chunk.metadata = ChunkMetadata {
            is_overview: Some(true),
            ..ChunkMetadata::default()
        };
        chunk
    }

    fn build_import_chunk(&self, language: Language, source: &[u8], rel_path: &str, imports: &[Node]) -> Option<CodeChunk> {
        if imports.is_empty() {
            return None;
        }
        let start_line = imports.iter().map(|n| n.start_position().row).min().unwrap() + 1;
        let end_line = imports.iter().map(|n| n.end_position().row).max().unwrap() + 1;
        let content = imports
            .iter()
            .map(|n| node_text(*n, source).into_owned())
            .collect::<Vec<_>>()
            .join("\n");
        let mut chunk = CodeChunk::new(rel_path, language, ChunkType::Import, ANONYMOUS, content, start_line, end_line);
        chunk.metadata.import_count = Some(imports.len());
        Some(chunk)
    }

    fn build_class_chunks(&self, language: Language, source: &[u8], rel_path: &str, class_node: Node, class_name: &str) -> Vec<CodeChunk> {
        let dialect = dialect_for(language);
        let start_line = class_node.start_position().row + 1;
        let end_line = class_node.end_position().row + 1;
        let line_count = end_line - start_line + 1;

        if line_count <= self.class_split_threshold {
            let mut chunk = CodeChunk::new(
                rel_path,
                language,
                ChunkType::Class,
                class_name,
                node_text(class_node, source).into_owned(),
                start_line,
                end_line,
            );
            chunk.docstring = dialect.docstring(class_node, source);
            chunk.metadata.line_count = Some(line_count);
            chunk.metadata.parent_classes = dialect.parent_classes(class_node, source);
            return vec![chunk];
        }

        let body = class_node.child_by_field_name("body").unwrap_or(class_node);
        let methods: Vec<(Node, String)> = find_by_type(body, language.function_node_kinds())
            .into_iter()
            .filter(|m| enclosing_class(*m, language.class_ancestor_kinds()).map(|c| c.id()) == Some(class_node.id()))
            .map(|m| (m, dialect.node_name(m, source).unwrap_or_else(|| ANONYMOUS.to_string())))
            .collect();

        let signature_end = body.start_byte().min(class_node.end_byte());
        let signature_text = String::from_utf8_lossy(&source[class_node.start_byte()..signature_end])
            .trim_end()
            .to_string();
        let mut summary_content = signature_text;
        summary_content.push_str("\n# Methods: ");
        summary_content.push_str(&methods.iter().map(|(_, n)| n.as_str()).collect::<Vec<_>>().join(", "));

        let mut summary = CodeChunk::new(
            rel_path,
            language,
            ChunkType::Class,
            class_name,
            summary_content,
            start_line,
            end_line,
        );
        summary.docstring = dialect.docstring(class_node, source);
        summary.metadata = ChunkMetadata {
            is_summary: Some(true),
            line_count: Some(line_count),
            method_count: Some(methods.len()),
            parent_classes: dialect.parent_classes(class_node, source),
            ..ChunkMetadata::default()
        };

        let mut out = vec![summary];
        for (method_node, method_name) in methods {
            let mstart = method_node.start_position().row + 1;
            let mend = method_node.end_position().row + 1;
            let mut chunk = CodeChunk::new(
                rel_path,
                language,
                ChunkType::Method,
                method_name,
                node_text(method_node, source).into_owned(),
                mstart,
                mend,
            );
            chunk.parent_name = Some(class_name.to_string());
            chunk.docstring = dialect.docstring(method_node, source);
            metadata_for(language).enrich_function_metadata(method_node, source, &mut chunk.metadata);
            out.push(chunk);
        }
        out
    }

    fn build_function_chunk(&self, language: Language, source: &[u8], rel_path: &str, node: Node, name: &str) -> CodeChunk {
        let dialect = dialect_for(language);
        let start_line = node.start_position().row + 1;
        let end_line = node.end_position().row + 1;
        let mut chunk = CodeChunk::new(
            rel_path,
            language,
            ChunkType::Function,
            name,
            node_text(node, source).into_owned(),
            start_line,
            end_line,
        );
        chunk.docstring = dialect.docstring(node, source);
        metadata_for(language).enrich_function_metadata(node, source, &mut chunk.metadata);
        chunk
    }
}

impl CodeChunkerPort for TreeSitterChunker {
    fn chunk_file(&self, path: &Path, repo_root: &Path) -> Result<Option<Vec<CodeChunk>>, ParserError> {
        let Some((tree, language, bytes)) = parse_file(&self.parsers, path)? else {
            return Ok(None);
        };
        let rel_path = path
            .strip_prefix(repo_root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");
        Ok(Some(self.chunk_parsed(tree.root_node(), language, &bytes, &rel_path)))
    }

    fn chunk_content(&self, content: &[u8], language: Language, rel_path: &str) -> Result<Vec<CodeChunk>, ParserError> {
        let tree = self.parsers.parse(content, language)?;
        Ok(self.chunk_parsed(tree.root_node(), language, content, rel_path))
    }

    fn supported_languages(&self) -> &[Language] {
        &Language::ALL
    }
}

impl TreeSitterChunker {
    fn chunk_parsed(&self, root: Node, language: Language, source: &[u8], rel_path: &str) -> Vec<CodeChunk> {
        let dialect = dialect_for(language);
        let line_count = String::from_utf8_lossy(source).lines().count();

        let imports = self.top_level_imports(root, language, source);

        let class_nodes = find_by_type(root, language.class_node_kinds());
        let classes: Vec<(Node, String)> = class_nodes
            .into_iter()
            .map(|n| (n, dialect.node_name(n, source).unwrap_or_else(|| ANONYMOUS.to_string())))
            .collect();

        let top_level_functions: Vec<(Node, String)> = find_by_type(root, language.function_node_kinds())
            .into_iter()
            .filter(|n| enclosing_class(*n, language.class_ancestor_kinds()).is_none())
            .map(|n| (n, dialect.node_name(n, source).unwrap_or_else(|| ANONYMOUS.to_string())))
            .collect();

        let mut out = Vec::with_capacity(2 + classes.len() * 2 + top_level_functions.len());
        out.push(self.build_module_chunk(
            root,
            language,
            source,
            rel_path,
            &imports,
            &classes,
            &top_level_functions,
            line_count,
        ));
        if let Some(import_chunk) = self.build_import_chunk(language, source, rel_path, &imports) {
            out.push(import_chunk);
        }
        for (class_node, class_name) in &classes {
            out.extend(self.build_class_chunks(language, source, rel_path, *class_node, class_name));
        }
        for (func_node, func_name) in &top_level_functions {
            out.push(self.build_function_chunk(language, source, rel_path, *func_node, func_name));
        }
        out
    }
}

/// Used by the Indexer to pair a discovered file with the repo root it was
/// scanned under, for batched chunking.
pub type ChunkBatchEntry = (PathBuf, PathBuf);

#[cfg(test)]
mod tests {
    use super::*;

    const GREETER_SRC: &str = "class Greeter:\n    def __init__(self, prefix: str = \"Hello\"):\n        self.prefix = prefix\n    def greet(self, name: str) -> str:\n        \"\"\"Greet someone.\"\"\"\n        return f\"{self.prefix}, {name}!\"\n";

    #[test]
    fn s1_whole_class_below_threshold() {
        let chunker = TreeSitterChunker::new(200);
        let chunks = chunker.chunk_content(GREETER_SRC.as_bytes(), Language::Python, "greeter.py").unwrap();
        assert_eq!(chunks[0].chunk_type, ChunkType::Module);
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 6);
        assert_eq!(chunks[0].metadata.is_overview, Some(true));

        let class_chunk = chunks.iter().find(|c| c.chunk_type == ChunkType::Class).unwrap();
        assert_eq!(class_chunk.name, "Greeter");
        assert_eq!(class_chunk.metadata.line_count, Some(6));
        assert!(chunks.iter().all(|c| c.chunk_type != ChunkType::Method));
    }

    #[test]
    fn s1_split_class_below_threshold() {
        let chunker = TreeSitterChunker::new(4);
        let chunks = chunker.chunk_content(GREETER_SRC.as_bytes(), Language::Python, "greeter.py").unwrap();

        let summary = chunks.iter().find(|c| c.chunk_type == ChunkType::Class).unwrap();
        assert_eq!(summary.metadata.is_summary, Some(true));

        let methods: Vec<_> = chunks.iter().filter(|c| c.chunk_type == ChunkType::Method).collect();
        assert_eq!(methods.len(), 2);
        assert_eq!(methods[0].name, "__init__");
        assert_eq!(methods[0].parent_name.as_deref(), Some("Greeter"));
        assert_eq!(methods[1].name, "greet");
        assert_eq!(methods[1].parent_name.as_deref(), Some("Greeter"));
        assert_eq!(methods[1].metadata.parameter_types.get("name").map(String::as_str), Some("str"));
        assert_eq!(methods[1].metadata.return_type.as_deref(), Some("str"));
        assert_eq!(methods[1].docstring.as_deref(), Some("Greet someone."));
    }

    #[test]
    fn invariant_start_line_le_end_line_for_every_chunk() {
        let chunker = TreeSitterChunker::new(4);
        let chunks = chunker.chunk_content(GREETER_SRC.as_bytes(), Language::Python, "greeter.py").unwrap();
        for chunk in &chunks {
            assert!(chunk.start_line >= 1);
            assert!(chunk.start_line <= chunk.end_line);
        }
    }

    #[test]
    fn chunker_is_deterministic_across_runs() {
        let chunker = TreeSitterChunker::new(4);
        let a = chunker.chunk_content(GREETER_SRC.as_bytes(), Language::Python, "greeter.py").unwrap();
        let b = chunker.chunk_content(GREETER_SRC.as_bytes(), Language::Python, "greeter.py").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn top_level_function_has_no_parent_name() {
        let chunker = TreeSitterChunker::new(200);
        let chunks = chunker
            .chunk_content(b"def f():\n    pass\n", Language::Python, "m.py")
            .unwrap();
        let func = chunks.iter().find(|c| c.chunk_type == ChunkType::Function).unwrap();
        assert_eq!(func.name, "f");
        assert!(func.parent_name.is_none());
    }

    #[test]
    fn every_method_chunk_has_its_class_chunk_emitted_earlier() {
        let chunker = TreeSitterChunker::new(4);
        let chunks = chunker.chunk_content(GREETER_SRC.as_bytes(), Language::Python, "greeter.py").unwrap();

        for (i, chunk) in chunks.iter().enumerate() {
            if chunk.chunk_type != ChunkType::Method {
                continue;
            }
            let parent_name = chunk.parent_name.as_deref().expect("method chunk must carry a parent_name");
            let class_emitted_earlier = chunks[..i]
                .iter()
                .any(|c| c.chunk_type == ChunkType::Class && c.name == parent_name);
            assert!(class_emitted_earlier, "no Class chunk named {parent_name:?} emitted before method {}", chunk.name);
        }
    }

    #[test]
    fn import_chunk_counts_top_level_imports_only() {
        let chunker = TreeSitterChunker::new(200);
        let src = b"import os\nimport sys\n\ndef f():\n    import json\n    return json\n";
        let chunks = chunker.chunk_content(src, Language::Python, "m.py").unwrap();
        let import_chunk = chunks.iter().find(|c| c.chunk_type == ChunkType::Import).unwrap();
        assert_eq!(import_chunk.metadata.import_count, Some(2));
    }
}
