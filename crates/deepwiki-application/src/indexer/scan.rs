//! Repository scan: recursive traversal applying the configured
//! include/exclude glob lists. Extension recognition is left to the
//! `CodeChunker` port — this step only narrows the candidate set by path
//! shape, not by language.

use std::path::{Path, PathBuf};

use deepwiki_domain::error::IndexError;
use deepwiki_domain::value_objects::IndexerConfig;
use glob::Pattern;
use walkdir::WalkDir;

/// Returns every regular file under `repo_root` whose path (relative to
/// the root, forward-slash normalized) matches at least one `include`
/// pattern and no `exclude` pattern.
pub fn scan_repository(repo_root: &Path, config: &IndexerConfig) -> Result<Vec<PathBuf>, IndexError> {
    let include: Vec<Pattern> = compile_patterns(&config.include)?;
    let exclude: Vec<Pattern> = compile_patterns(&config.exclude)?;

    let mut matches = Vec::new();
    for entry in WalkDir::new(repo_root).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let abs_path = entry.path();
        let rel_path = abs_path
            .strip_prefix(repo_root)
            .unwrap_or(abs_path)
            .to_string_lossy()
            .replace('\\', "/");

        if exclude.iter().any(|p| p.matches(&rel_path)) {
            continue;
        }
        if include.iter().any(|p| p.matches(&rel_path)) {
            matches.push(abs_path.to_path_buf());
        }
    }

    matches.sort();
    Ok(matches)
}

fn compile_patterns(raw: &[String]) -> Result<Vec<Pattern>, IndexError> {
    raw.iter()
        .map(|p| Pattern::new(p).map_err(|e| IndexError::Status(format!("invalid glob pattern {p:?}: {e}"))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn config(include: &[&str], exclude: &[&str]) -> IndexerConfig {
        IndexerConfig {
            include: include.iter().map(|s| s.to_string()).collect(),
            exclude: exclude.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn finds_files_matching_include_and_not_exclude() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.py"), "x").unwrap();
        fs::create_dir(dir.path().join("node_modules")).unwrap();
        fs::write(dir.path().join("node_modules/b.py"), "x").unwrap();

        let cfg = config(&["**/*"], &["**/node_modules/**"]);
        let found = scan_repository(dir.path(), &cfg).unwrap();

        assert_eq!(found, vec![dir.path().join("a.py")]);
    }

    #[test]
    fn traversal_order_is_deterministic() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("z.py"), "x").unwrap();
        fs::write(dir.path().join("a.py"), "x").unwrap();

        let cfg = config(&["**/*"], &[]);
        let found = scan_repository(dir.path(), &cfg).unwrap();

        assert_eq!(found, vec![dir.path().join("a.py"), dir.path().join("z.py")]);
    }
}
