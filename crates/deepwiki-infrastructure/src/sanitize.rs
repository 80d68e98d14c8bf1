//! §4.3 "Sanitization": any string value used inside a scalar filter
//! predicate is validated before it reaches SQL. Even though every query in
//! this crate binds values as parameters (DuckDB escapes those for us),
//! this validation is a second gate per the spec's explicit contract: a
//! value outside the safe set or over the length limit makes the lookup
//! return empty without ever executing a query, rather than trusting the
//! backend's parameterization alone.

const MAX_SCALAR_LEN: usize = 1024;

fn is_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | ' ' | ':' | '\\')
}

/// Returns `Some(value)` unchanged if it passes the safe-set and length
/// check, `None` otherwise.
pub fn sanitize_scalar(value: &str) -> Option<&str> {
    if value.is_empty() || value.len() > MAX_SCALAR_LEN {
        return None;
    }
    value.chars().all(is_safe_char).then_some(value)
}
