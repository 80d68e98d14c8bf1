use deepwiki_domain::entities::CodeChunk;

/// Number of leading content lines folded into the embedding prompt. The
/// exact format is this store's internal contract (§4.3) and must stay
/// stable for a given schema version — changing it invalidates every
/// previously embedded vector.
const EMBED_CONTENT_LINES: usize = 30;

/// Canonical text used to embed a chunk: language, chunk type, file path,
/// name/parent, docstring (if any), and the first N lines of content.
pub fn embed_text(chunk: &CodeChunk) -> String {
    let mut parts = vec![
        format!("language: {}", chunk.language.as_str()),
        format!("type: {}", chunk.chunk_type.as_str()),
        format!("file: {}", chunk.file_path),
    ];
    match &chunk.parent_name {
        Some(parent) => parts.push(format!("name: {parent}.{}", chunk.name)),
        None => parts.push(format!("name: {}", chunk.name)),
    }
    if let Some(doc) = &chunk.docstring {
        parts.push(format!("doc: {doc}"));
    }
    let content_head: String = chunk.content.lines().take(EMBED_CONTENT_LINES).collect::<Vec<_>>().join("\n");
    parts.push(content_head);
    parts.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use deepwiki_domain::value_objects::{ChunkType, Language};

    #[test]
    fn embed_text_includes_parent_name_for_methods() {
        let mut chunk = CodeChunk::new("a.py", Language::Python, ChunkType::Method, "greet", "def greet(): pass", 1, 1);
        chunk.parent_name = Some("Greeter".to_string());
        let text = embed_text(&chunk);
        assert!(text.contains("name: Greeter.greet"));
    }

    #[test]
    fn embed_text_is_stable_for_the_same_chunk() {
        let chunk = CodeChunk::new("a.py", Language::Python, ChunkType::Function, "f", "def f(): pass", 1, 1);
        assert_eq!(embed_text(&chunk), embed_text(&chunk));
    }
}
