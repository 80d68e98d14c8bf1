//! Extracts the first balanced `{…}` object from free-form LLM output, so
//! a reply that wraps JSON in prose or a markdown fence still parses.

/// Returns the substring spanning the first top-level `{...}` object in
/// `text`, or `None` if no balanced object is found. Braces inside string
/// literals (including escaped quotes) do not affect depth tracking.
pub fn extract_first_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_a_bare_object() {
        assert_eq!(extract_first_json_object(r#"{"a": 1}"#), Some(r#"{"a": 1}"#));
    }

    #[test]
    fn extracts_an_object_wrapped_in_prose() {
        let text = "Sure, here you go:\n```json\n{\"a\": [1, 2]}\n```\nLet me know if you need more.";
        assert_eq!(extract_first_json_object(text), Some(r#"{"a": [1, 2]}"#));
    }

    #[test]
    fn ignores_braces_inside_string_literals() {
        let text = r#"{"a": "}} not a brace {{", "b": 2}"#;
        assert_eq!(extract_first_json_object(text), Some(text));
    }

    #[test]
    fn returns_none_when_unbalanced() {
        assert_eq!(extract_first_json_object("{\"a\": 1"), None);
    }

    #[test]
    fn returns_none_with_no_object_at_all() {
        assert_eq!(extract_first_json_object("no json here"), None);
    }
}
