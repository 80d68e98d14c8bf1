//! §4.2 "Language-specific metadata extraction": parameter types, parameter
//! defaults, return type, decorators, `is_async`, and `raises` are only
//! non-trivial for Python in v1. Modeled as a capability trait whose default
//! implementation returns empty maps (§9), so adding a second language's
//! metadata extractor later doesn't touch the chunker itself.

use std::collections::BTreeMap;

use deepwiki_domain::entities::ChunkMetadata;
use deepwiki_domain::value_objects::Language;
use tree_sitter::Node;

use crate::parser::node_text;

pub trait LanguageMetadata: Send + Sync {
    fn language(&self) -> Language;

    /// Populates the Python-only metadata fields on `metadata` for a
    /// function/method `node`. The default implementation is a no-op.
    fn enrich_function_metadata(&self, _node: Node, _source: &[u8], _metadata: &mut ChunkMetadata) {}
}

struct NoopMetadata(Language);
impl LanguageMetadata for NoopMetadata {
    fn language(&self) -> Language {
        self.0
    }
}

struct PythonMetadata;

const EXCLUDED_PARAM_NAMES: [&str; 2] = ["self", "cls"];

impl LanguageMetadata for PythonMetadata {
    fn language(&self) -> Language {
        Language::Python
    }

    fn enrich_function_metadata(&self, node: Node, source: &[u8], metadata: &mut ChunkMetadata) {
        metadata.is_async = Some(is_async_def(node, source));
        metadata.decorators = decorators_of(node, source);

        if let Some(return_type_node) = node.child_by_field_name("return_type") {
            metadata.return_type = Some(node_text(return_type_node, source).into_owned());
        }

        let mut types = BTreeMap::new();
        let mut defaults = BTreeMap::new();
        if let Some(params) = node.child_by_field_name("parameters") {
            let mut cursor = params.walk();
            for param in params.children(&mut cursor) {
                extract_parameter(param, source, &mut types, &mut defaults);
            }
        }
        metadata.parameter_types = types;
        metadata.parameter_defaults = defaults;

        if let Some(body) = node.child_by_field_name("body") {
            metadata.raises = collect_raises(body, source);
        }
    }
}

fn is_async_def(node: Node, source: &[u8]) -> bool {
    node.utf8_text(source)
        .map(|t| t.trim_start().starts_with("async"))
        .unwrap_or(false)
}

fn decorators_of(node: Node, source: &[u8]) -> Vec<String> {
    // A Python `decorated_definition` wraps the function_definition and its
    // decorator siblings; when the chunker hands us the bare
    // function_definition, decorators live as preceding siblings under the
    // shared `decorated_definition` parent.
    let Some(parent) = node.parent() else {
        return Vec::new();
    };
    if parent.kind() != "decorated_definition" {
        return Vec::new();
    }
    let mut cursor = parent.walk();
    parent
        .children(&mut cursor)
        .filter(|c| c.kind() == "decorator")
        .map(|c| node_text(c, source).trim_start_matches('@').trim().to_string())
        .collect()
}

fn extract_parameter(
    param: Node,
    source: &[u8],
    types: &mut BTreeMap<String, String>,
    defaults: &mut BTreeMap<String, String>,
) {
    let (name_node, type_node, default_node) = match param.kind() {
        "identifier" => (Some(param), None, None),
        "typed_parameter" => (param.child(0), param.child_by_field_name("type"), None),
        "default_parameter" => (
            param.child_by_field_name("name"),
            None,
            param.child_by_field_name("value"),
        ),
        "typed_default_parameter" => (
            param.child_by_field_name("name"),
            param.child_by_field_name("type"),
            param.child_by_field_name("value"),
        ),
        _ => return,
    };
    let Some(name_node) = name_node else { return };
    let name = node_text(name_node, source).into_owned();
    if EXCLUDED_PARAM_NAMES.contains(&name.as_str()) {
        return;
    }
    if let Some(type_node) = type_node {
        types.insert(name.clone(), node_text(type_node, source).into_owned());
    }
    if let Some(default_node) = default_node {
        defaults.insert(name, node_text(default_node, source).into_owned());
    }
}

/// Collects every exception identifier/attribute named in a `raise`
/// statement within `body`, skipping any nested function body so a raise
/// inside a closure defined in this function isn't attributed to it.
fn collect_raises(body: Node, source: &[u8]) -> Vec<String> {
    let mut out = Vec::new();
    let mut stack = vec![body];
    while let Some(node) = stack.pop() {
        if node.kind() == "raise_statement" {
            if let Some(expr) = node.named_child(0) {
                out.push(raise_target_text(expr, source));
            }
            continue;
        }
        if node.kind() == "function_definition" && node != body {
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<Node> = node.children(&mut cursor).collect();
        for child in children.into_iter().rev() {
            stack.push(child);
        }
    }
    out
}

fn raise_target_text(expr: Node, source: &[u8]) -> String {
    // `raise SomeError(...)` wraps the exception name in a `call`; take the
    // callee instead of the whole argument list.
    if expr.kind() == "call" {
        if let Some(func) = expr.child_by_field_name("function") {
            return node_text(func, source).into_owned();
        }
    }
    node_text(expr, source).into_owned()
}

/// Returns the metadata extractor for `language`.
pub fn metadata_for(language: Language) -> &'static dyn LanguageMetadata {
    match language {
        Language::Python => &PythonMetadata,
        Language::TypeScript => &NoopMetadata(Language::TypeScript),
        Language::JavaScript => &NoopMetadata(Language::JavaScript),
        Language::Go => &NoopMetadata(Language::Go),
        Language::Rust => &NoopMetadata(Language::Rust),
        Language::Java => &NoopMetadata(Language::Java),
        Language::C => &NoopMetadata(Language::C),
        Language::Cpp => &NoopMetadata(Language::Cpp),
        Language::Ruby => &NoopMetadata(Language::Ruby),
        Language::Php => &NoopMetadata(Language::Php),
        Language::Kotlin => &NoopMetadata(Language::Kotlin),
        Language::CSharp => &NoopMetadata(Language::CSharp),
        Language::Swift => &NoopMetadata(Language::Swift),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::find_by_type;
    use crate::parser::registry::Parsers;

    #[test]
    fn extracts_parameter_types_and_return_type() {
        let parsers = Parsers::new();
        let source = b"def greet(self, name: str) -> str:\n    return name\n";
        let tree = parsers.parse(source, Language::Python).unwrap();
        let func = find_by_type(tree.root_node(), &["function_definition"])[0];
        let mut metadata = ChunkMetadata::default();
        metadata_for(Language::Python).enrich_function_metadata(func, source, &mut metadata);
        assert_eq!(metadata.return_type.as_deref(), Some("str"));
        assert_eq!(metadata.parameter_types.get("name").map(String::as_str), Some("str"));
        assert!(!metadata.parameter_types.contains_key("self"));
    }

    #[test]
    fn collects_raises_skipping_nested_functions() {
        let parsers = Parsers::new();
        let source = br#"
def f():
    def inner():
        raise InnerError()
    raise ValueError("boom")
"#;
        let tree = parsers.parse(source, Language::Python).unwrap();
        let func = find_by_type(tree.root_node(), &["function_definition"])[0];
        let mut metadata = ChunkMetadata::default();
        metadata_for(Language::Python).enrich_function_metadata(func, source, &mut metadata);
        assert_eq!(metadata.raises, vec!["ValueError".to_string()]);
    }

    #[test]
    fn detects_async_and_decorators() {
        let parsers = Parsers::new();
        let source = b"@app.route(\"/\")\nasync def handler():\n    pass\n";
        let tree = parsers.parse(source, Language::Python).unwrap();
        let func = find_by_type(tree.root_node(), &["function_definition"])[0];
        let mut metadata = ChunkMetadata::default();
        metadata_for(Language::Python).enrich_function_metadata(func, source, &mut metadata);
        assert_eq!(metadata.is_async, Some(true));
        assert_eq!(metadata.decorators, vec!["app.route(\"/\")".to_string()]);
    }
}
