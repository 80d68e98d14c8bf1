use std::cell::RefCell;
use std::collections::HashMap;
use std::path::Path;

use deepwiki_domain::error::ParserError;
use deepwiki_domain::value_objects::Language;
use tree_sitter::{Parser, Tree};

fn grammar_for(language: Language) -> tree_sitter::Language {
    match language {
        Language::Python => tree_sitter_python::LANGUAGE.into(),
        Language::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        Language::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
        Language::Go => tree_sitter_go::LANGUAGE.into(),
        Language::Rust => tree_sitter_rust::LANGUAGE.into(),
        Language::Java => tree_sitter_java::LANGUAGE.into(),
        Language::C => tree_sitter_c::LANGUAGE.into(),
        Language::Cpp => tree_sitter_cpp::LANGUAGE.into(),
        Language::Ruby => tree_sitter_ruby::LANGUAGE.into(),
        Language::Php => tree_sitter_php::LANGUAGE_PHP.into(),
        Language::Kotlin => tree_sitter_kotlin_ng::LANGUAGE.into(),
        Language::CSharp => tree_sitter_c_sharp::LANGUAGE.into(),
        Language::Swift => tree_sitter_swift::LANGUAGE.into(),
    }
}

thread_local! {
    /// One `tree_sitter::Parser` per language per worker thread (§4.1: "parser
    /// objects are not shared across threads; create one per worker"). Each
    /// OS/tokio-blocking thread that calls into the parser gets its own cache,
    /// built lazily on first use of each language.
    static THREAD_PARSERS: RefCell<HashMap<&'static str, Parser>> = RefCell::new(HashMap::new());
}

/// Wraps tree-sitter grammars for the closed `Language` set, memoizing one
/// parser per language per thread. Stateless itself — it only owns the
/// frozen extension table via `Language` and the grammar lookup above.
#[derive(Debug, Default, Clone, Copy)]
pub struct Parsers;

impl Parsers {
    pub fn new() -> Self {
        Parsers
    }

    /// Pure lookup over the frozen extension table.
    pub fn detect_language(&self, path: &Path) -> Option<Language> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Language::from_extension)
    }

    /// Parses `bytes` as `language`. tree-sitter is error-tolerant: malformed
    /// syntax yields a tree containing ERROR nodes rather than a failure, so
    /// this never fails on well-formed UTF-8 input.
    pub fn parse(&self, bytes: &[u8], language: Language) -> Result<Tree, ParserError> {
        THREAD_PARSERS.with(|cell| {
            let mut parsers = cell.borrow_mut();
            let parser = parsers.entry(language.as_str()).or_insert_with(|| {
                let mut parser = Parser::new();
                parser
                    .set_language(&grammar_for(language))
                    .expect("grammar is bundled and version-matched at build time");
                parser
            });
            parser.parse(bytes, None).ok_or_else(|| ParserError::ParseFailure {
                path: String::new(),
                message: "tree-sitter returned no tree (parser likely cancelled)".to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_language_from_extension() {
        let parsers = Parsers::new();
        assert_eq!(parsers.detect_language(Path::new("a/b.py")), Some(Language::Python));
        assert_eq!(parsers.detect_language(Path::new("a/b.rs")), Some(Language::Rust));
        assert_eq!(parsers.detect_language(Path::new("a/b.unknown")), None);
    }

    #[test]
    fn parses_trivial_python_source() {
        let parsers = Parsers::new();
        let tree = parsers.parse(b"def f():\n    pass\n", Language::Python).unwrap();
        assert_eq!(tree.root_node().kind(), "module");
        assert!(!tree.root_node().has_error());
    }

    #[test]
    fn tolerates_syntax_errors() {
        let parsers = Parsers::new();
        let tree = parsers.parse(b"def f(:\n", Language::Python).unwrap();
        // tree-sitter still returns a tree; it just contains an ERROR node.
        assert!(tree.root_node().has_error());
    }

    #[test]
    fn reuses_the_same_thread_local_parser_across_calls() {
        let parsers = Parsers::new();
        let _ = parsers.parse(b"x = 1\n", Language::Python).unwrap();
        let _ = parsers.parse(b"y = 2\n", Language::Python).unwrap();
        THREAD_PARSERS.with(|cell| {
            assert_eq!(cell.borrow().len(), 1);
        });
    }
}
