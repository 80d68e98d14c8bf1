//! Per-language dispatch for the three extraction rules that differ by
//! grammar shape: identifier lookup, docstring extraction, and parent-class
//! extraction. §9 "Language-specific chunker branches": modeled as one
//! trait with one implementation per `Language` variant rather than a
//! `match` sprinkled through the chunker.

use deepwiki_domain::value_objects::Language;
use tree_sitter::Node;

use super::ast::{find_by_type, node_text};

/// The container node type that holds a class's parent-type list, per
/// language. `None` means the language has no syntactic inheritance the
/// chunker extracts (Go embeds via struct fields, Rust has no class
/// inheritance at all).
fn bases_container_kind(language: Language) -> Option<&'static str> {
    match language {
        Language::Python => Some("argument_list"),
        Language::TypeScript | Language::JavaScript => Some("class_heritage"),
        Language::Ruby => Some("superclass"),
        Language::Php => Some("base_clause"),
        Language::Kotlin => Some("delegation_specifiers"),
        Language::CSharp => Some("base_list"),
        Language::Swift => Some("type_inheritance_clause"),
        Language::Cpp => Some("base_class_clause"),
        Language::Java => Some("superclass"),
        Language::Go | Language::Rust | Language::C => None,
    }
}

/// Node kinds, within a bases container, that represent one parent type
/// name. Ruby is special-cased per the open question in §9: it captures
/// `constant` and `scope_resolution` nodes specifically (not the generic
/// identifier kinds other grammars use).
fn identifier_kinds_in_bases(language: Language) -> &'static [&'static str] {
    match language {
        Language::Ruby => &["constant", "scope_resolution"],
        _ => &["identifier", "type_identifier", "scoped_identifier", "qualified_name", "user_type"],
    }
}

/// Per-language identifier/docstring/parent-class extraction. Implemented
/// once per `Language` variant; the default methods below cover the common
/// case (a `name` field lookup, a bases-container scan) and only Python
/// overrides docstring extraction with grammar-specific logic.
pub trait LanguageDialect: Send + Sync {
    fn language(&self) -> Language;

    /// `name`-field lookup, handling the shapes that don't expose a plain
    /// `name` field (PHP/Kotlin/C#/Swift constructs that nest the
    /// identifier one level deeper). Returns `None` for anonymous
    /// constructs (e.g. JS arrow functions assigned to a pattern).
    fn node_name(&self, node: Node, source: &[u8]) -> Option<String> {
        if let Some(name_node) = node.child_by_field_name("name") {
            return Some(node_text(name_node, source).into_owned());
        }
        // Some grammars expose the identifier as the first named child
        // instead of a `name` field (e.g. Go's `type_declaration` wraps a
        // `type_spec` whose own `name` field is what we actually want).
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if matches!(child.kind(), "type_spec" | "function_declarator") {
                if let Some(inner) = child.child_by_field_name("name") {
                    return Some(node_text(inner, source).into_owned());
                }
            }
        }
        None
    }

    /// Extracts a documentation comment/string attached to `node`, if the
    /// grammar exposes one. Default: absent (only Python and JS/TS override
    /// this with real logic per §4.1).
    fn docstring(&self, _node: Node, _source: &[u8]) -> Option<String> {
        None
    }

    /// Module-level docstring, extracted from the parse tree's root node.
    /// Default: absent.
    fn module_docstring(&self, _root: Node, _source: &[u8]) -> Option<String> {
        None
    }

    /// Parent class/interface names for a class-like `node`, scanning its
    /// language-specific bases container for identifier nodes.
    fn parent_classes(&self, node: Node, source: &[u8]) -> Vec<String> {
        let Some(container_kind) = bases_container_kind(self.language()) else {
            return Vec::new();
        };
        let mut cursor = node.walk();
        let Some(container) = node.children(&mut cursor).find(|c| c.kind() == container_kind) else {
            return Vec::new();
        };
        find_by_type(container, identifier_kinds_in_bases(self.language()))
            .into_iter()
            .map(|n| node_text(n, source).into_owned())
            .collect()
    }
}

struct PythonDialect;
impl LanguageDialect for PythonDialect {
    fn language(&self) -> Language {
        Language::Python
    }

    /// First `expression_statement` child of the body whose first child is
    /// a string literal; strips the `"""`/`'''` delimiters and surrounding
    /// whitespace.
    fn docstring(&self, node: Node, source: &[u8]) -> Option<String> {
        let body = node.child_by_field_name("body")?;
        let mut cursor = body.walk();
        let first_stmt = body.children(&mut cursor).find(|c| c.kind() == "expression_statement")?;
        let mut inner_cursor = first_stmt.walk();
        let string_node = first_stmt
            .children(&mut inner_cursor)
            .find(|c| c.kind() == "string")?;
        let raw = node_text(string_node, source).into_owned();
        Some(strip_python_string_delimiters(&raw))
    }

    /// Python's `module` node has no `body` field — its direct children
    /// *are* the body — so the module docstring is the first
    /// `expression_statement` child of the root itself.
    fn module_docstring(&self, root: Node, source: &[u8]) -> Option<String> {
        let mut cursor = root.walk();
        let first_stmt = root.children(&mut cursor).find(|c| c.kind() == "expression_statement")?;
        let mut inner_cursor = first_stmt.walk();
        let string_node = first_stmt
            .children(&mut inner_cursor)
            .find(|c| c.kind() == "string")?;
        let raw = node_text(string_node, source).into_owned();
        Some(strip_python_string_delimiters(&raw))
    }
}

fn strip_python_string_delimiters(raw: &str) -> String {
    let trimmed = raw.trim();
    for quote in ["\"\"\"", "'''"] {
        if let Some(inner) = trimmed.strip_prefix(quote).and_then(|s| s.strip_suffix(quote)) {
            return inner.trim().to_string();
        }
    }
    for quote in ['"', '\''] {
        if trimmed.starts_with(quote) && trimmed.ends_with(quote) && trimmed.len() >= 2 {
            return trimmed[1..trimmed.len() - 1].trim().to_string();
        }
    }
    trimmed.to_string()
}

struct JsLikeDialect(Language);
impl LanguageDialect for JsLikeDialect {
    fn language(&self) -> Language {
        self.0
    }

    /// Preceding block-comment sibling beginning with `/**`.
    fn docstring(&self, node: Node, source: &[u8]) -> Option<String> {
        let mut sibling = node.prev_sibling();
        while let Some(s) = sibling {
            if s.kind() == "comment" {
                let text = node_text(s, source).into_owned();
                if text.starts_with("/**") {
                    return Some(
                        text.trim_start_matches("/**")
                            .trim_end_matches("*/")
                            .lines()
                            .map(|l| l.trim().trim_start_matches('*').trim())
                            .collect::<Vec<_>>()
                            .join("\n")
                            .trim()
                            .to_string(),
                    );
                }
                return None;
            }
            if s.is_extra() {
                sibling = s.prev_sibling();
                continue;
            }
            break;
        }
        None
    }

    /// Leading `/**`-style block comment at the very top of the file.
    fn module_docstring(&self, root: Node, source: &[u8]) -> Option<String> {
        let first = root.child(0)?;
        if first.kind() != "comment" {
            return None;
        }
        let text = node_text(first, source).into_owned();
        text.starts_with("/**").then(|| {
            text.trim_start_matches("/**")
                .trim_end_matches("*/")
                .trim()
                .to_string()
        })
    }
}

macro_rules! default_dialect {
    ($name:ident, $lang:expr) => {
        struct $name;
        impl LanguageDialect for $name {
            fn language(&self) -> Language {
                $lang
            }
        }
    };
}

default_dialect!(GoDialect, Language::Go);
default_dialect!(RustDialect, Language::Rust);
default_dialect!(JavaDialect, Language::Java);
default_dialect!(CDialect, Language::C);
default_dialect!(CppDialect, Language::Cpp);
default_dialect!(RubyDialect, Language::Ruby);
default_dialect!(PhpDialect, Language::Php);
default_dialect!(KotlinDialect, Language::Kotlin);
default_dialect!(CSharpDialect, Language::CSharp);
default_dialect!(SwiftDialect, Language::Swift);

/// Returns the dialect implementation for `language`.
pub fn dialect_for(language: Language) -> &'static dyn LanguageDialect {
    match language {
        Language::Python => &PythonDialect,
        Language::TypeScript => {
            const D: JsLikeDialect = JsLikeDialect(Language::TypeScript);
            &D
        }
        Language::JavaScript => {
            const D: JsLikeDialect = JsLikeDialect(Language::JavaScript);
            &D
        }
        Language::Go => &GoDialect,
        Language::Rust => &RustDialect,
        Language::Java => &JavaDialect,
        Language::C => &CDialect,
        Language::Cpp => &CppDialect,
        Language::Ruby => &RubyDialect,
        Language::Php => &PhpDialect,
        Language::Kotlin => &KotlinDialect,
        Language::CSharp => &CSharpDialect,
        Language::Swift => &SwiftDialect,
    }
}
