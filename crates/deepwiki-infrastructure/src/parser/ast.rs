use std::path::Path;

use chrono::{DateTime, Utc};
use deepwiki_domain::entities::FileInfo;
use deepwiki_domain::value_objects::Language;
use sha2::{Digest, Sha256};
use tree_sitter::Node;

/// Decodes the byte slice `[start_byte, end_byte)` of `node` against
/// `source`, replacing invalid UTF-8 rather than failing — matching the
/// `content`/`docstring` fields' documented lossy decoding.
pub fn node_text<'a>(node: Node<'_>, source: &'a [u8]) -> std::borrow::Cow<'a, str> {
    String::from_utf8_lossy(&source[node.start_byte()..node.end_byte()])
}

/// Pre-order collection of every descendant of `root` (`root` itself
/// included) whose `kind()` is in `type_set`.
pub fn find_by_type<'tree>(root: Node<'tree>, type_set: &[&str]) -> Vec<Node<'tree>> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    // Explicit stack rather than recursion per §9 "Recursive AST walk":
    // pathological trees should not risk blowing a thread's default stack.
    while let Some(node) = stack.pop() {
        if type_set.contains(&node.kind()) {
            out.push(node);
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'tree>> = node.children(&mut cursor).collect();
        for child in children.into_iter().rev() {
            stack.push(child);
        }
    }
    out
}

/// Walks `node`'s ancestry until a node whose `kind()` is in
/// `class_kinds` is found, or the tree root is reached. Used as the
/// "is this top-level function actually a method" ancestry check.
pub fn enclosing_class<'tree>(node: Node<'tree>, class_kinds: &[&str]) -> Option<Node<'tree>> {
    let mut current = node.parent();
    while let Some(n) = current {
        if class_kinds.contains(&n.kind()) {
            return Some(n);
        }
        current = n.parent();
    }
    None
}

/// Computes the SHA-256 of the full file bytes and the file's relative path
/// against `repo_root`.
pub fn file_info(
    path: &Path,
    repo_root: &Path,
    language: Language,
) -> std::io::Result<FileInfo> {
    let bytes = std::fs::read(path)?;
    let metadata = std::fs::metadata(path)?;
    let mtime: DateTime<Utc> = metadata
        .modified()
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());

    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let sha256_hex = hex::encode(hasher.finalize());

    let rel_path = path
        .strip_prefix(repo_root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/");

    Ok(FileInfo {
        rel_path,
        absolute_path: path.to_path_buf(),
        language,
        sha256_hex,
        size_bytes: bytes.len() as u64,
        mtime,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::registry::Parsers;

    #[test]
    fn node_text_round_trips_the_source() {
        let parsers = Parsers::new();
        let source = b"def foo():\n    pass\n";
        let tree = parsers.parse(source, Language::Python).unwrap();
        assert_eq!(node_text(tree.root_node(), source), "def foo():\n    pass\n");
    }

    #[test]
    fn find_by_type_collects_in_pre_order() {
        let parsers = Parsers::new();
        let source = b"class A:\n    def m(self):\n        pass\n\ndef f():\n    pass\n";
        let tree = parsers.parse(source, Language::Python).unwrap();
        let classes = find_by_type(tree.root_node(), &["class_definition"]);
        let functions = find_by_type(tree.root_node(), &["function_definition"]);
        assert_eq!(classes.len(), 1);
        assert_eq!(functions.len(), 2); // method + top-level function
    }

    #[test]
    fn enclosing_class_detects_methods() {
        let parsers = Parsers::new();
        let source = b"class A:\n    def m(self):\n        pass\n\ndef f():\n    pass\n";
        let tree = parsers.parse(source, Language::Python).unwrap();
        let functions = find_by_type(tree.root_node(), &["function_definition"]);
        let method = functions.iter().find(|n| node_text(**n, source).contains("def m")).unwrap();
        let top_level = functions.iter().find(|n| node_text(**n, source).contains("def f")).unwrap();
        assert!(enclosing_class(*method, &["class_definition"]).is_some());
        assert!(enclosing_class(*top_level, &["class_definition"]).is_none());
    }
}
