//! `Language` is a closed sum type rather than a string. Dispatch that the
//! original branched on `(language, node-kind)` instead goes through the
//! `LanguageDialect`/`LanguageMetadata` traits in `deepwiki-infrastructure`,
//! one implementation per variant here.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of languages the chunking pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    Python,
    TypeScript,
    JavaScript,
    Go,
    Rust,
    Java,
    C,
    Cpp,
    Ruby,
    Php,
    Kotlin,
    CSharp,
    Swift,
}

impl Language {
    /// All variants, for iteration (e.g. building a parser cache).
    pub const ALL: [Language; 13] = [
        Language::Python,
        Language::TypeScript,
        Language::JavaScript,
        Language::Go,
        Language::Rust,
        Language::Java,
        Language::C,
        Language::Cpp,
        Language::Ruby,
        Language::Php,
        Language::Kotlin,
        Language::CSharp,
        Language::Swift,
    ];

    /// Canonical string form. `search` matches against this exactly — the
    /// source does not canonicalize casing, and this spec requires exact
    /// match rather than inventing a case-insensitive comparison.
    pub fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Go => "go",
            Language::Rust => "rust",
            Language::Java => "java",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::Kotlin => "kotlin",
            Language::CSharp => "csharp",
            Language::Swift => "swift",
        }
    }

    /// File extensions (without the leading dot) recognized for this language.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Language::Python => &["py", "pyi"],
            Language::TypeScript => &["ts", "mts", "cts"],
            Language::JavaScript => &["js", "mjs", "cjs", "jsx"],
            Language::Go => &["go"],
            Language::Rust => &["rs"],
            Language::Java => &["java"],
            Language::C => &["c", "h"],
            Language::Cpp => &["cpp", "cc", "cxx", "hpp", "hh", "hxx"],
            Language::Ruby => &["rb"],
            Language::Php => &["php"],
            Language::Kotlin => &["kt", "kts"],
            Language::CSharp => &["cs"],
            Language::Swift => &["swift"],
        }
    }

    /// Pure lookup over the frozen extension table; `ext` is given without
    /// the leading dot.
    pub fn from_extension(ext: &str) -> Option<Language> {
        // TypeScript's .tsx is ambiguous with JSX-flavored TS; tree-sitter-typescript
        // exposes a dedicated tsx grammar, but for extension classification we
        // treat it as TypeScript, matching the single `IMPORT`/`CLASS`/`FUNCTION`
        // node-type sets used by the chunker.
        if ext.eq_ignore_ascii_case("tsx") {
            return Some(Language::TypeScript);
        }
        Language::ALL
            .into_iter()
            .find(|lang| lang.extensions().iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    /// Node-kind names that represent an import statement in this language's
    /// tree-sitter grammar.
    pub fn import_node_kinds(self) -> &'static [&'static str] {
        match self {
            Language::Python => &["import_statement", "import_from_statement"],
            Language::TypeScript | Language::JavaScript => {
                &["import_statement", "import_clause"]
            }
            Language::Go => &["import_declaration"],
            Language::Rust => &["use_declaration"],
            Language::Java => &["import_declaration"],
            Language::C | Language::Cpp => &["preproc_include"],
            Language::Ruby => &["call"], // `require`/`require_relative` calls
            Language::Php => &["namespace_use_declaration"],
            Language::Kotlin => &["import_header"],
            Language::CSharp => &["using_directive"],
            Language::Swift => &["import_declaration"],
        }
    }

    /// Node-kind names that represent a class/type declaration.
    pub fn class_node_kinds(self) -> &'static [&'static str] {
        match self {
            Language::Python => &["class_definition"],
            Language::TypeScript => &["class_declaration", "interface_declaration"],
            Language::JavaScript => &["class_declaration"],
            Language::Go => &["type_declaration"],
            Language::Rust => &["struct_item", "enum_item", "trait_item", "impl_item"],
            Language::Java => &["class_declaration", "interface_declaration"],
            Language::C => &["struct_specifier"],
            Language::Cpp => &["class_specifier", "struct_specifier"],
            Language::Ruby => &["class", "module"],
            Language::Php => &["class_declaration", "interface_declaration"],
            Language::Kotlin => &["class_declaration", "object_declaration"],
            Language::CSharp => &["class_declaration", "interface_declaration", "struct_declaration"],
            Language::Swift => &["class_declaration", "protocol_declaration", "struct_declaration"],
        }
    }

    /// Node-kind names that represent a function or method declaration.
    pub fn function_node_kinds(self) -> &'static [&'static str] {
        match self {
            Language::Python => &["function_definition"],
            Language::TypeScript => &["function_declaration", "method_definition"],
            Language::JavaScript => &["function_declaration", "method_definition"],
            Language::Go => &["function_declaration", "method_declaration"],
            Language::Rust => &["function_item"],
            Language::Java => &["method_declaration", "constructor_declaration"],
            Language::C => &["function_definition"],
            Language::Cpp => &["function_definition"],
            Language::Ruby => &["method", "singleton_method"],
            Language::Php => &["function_definition", "method_declaration"],
            Language::Kotlin => &["function_declaration"],
            Language::CSharp => &["method_declaration", "constructor_declaration"],
            Language::Swift => &["function_declaration"],
        }
    }

    /// Node-kind names used as the "inside a class" ancestry check: walk
    /// parents until one of these is found or the root is reached.
    pub fn class_ancestor_kinds(self) -> &'static [&'static str] {
        self.class_node_kinds()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_lookup_is_case_insensitive() {
        assert_eq!(Language::from_extension("PY"), Some(Language::Python));
        assert_eq!(Language::from_extension("rs"), Some(Language::Rust));
        assert_eq!(Language::from_extension("tsx"), Some(Language::TypeScript));
        assert_eq!(Language::from_extension("xyz"), None);
    }

    #[test]
    fn canonical_string_is_lowercase_and_stable() {
        assert_eq!(Language::CSharp.as_str(), "csharp");
        assert_eq!(Language::Cpp.as_str(), "cpp");
    }

    #[test]
    fn every_language_has_at_least_one_extension() {
        for lang in Language::ALL {
            assert!(!lang.extensions().is_empty());
        }
    }
}
