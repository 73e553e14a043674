//! Repository file discovery (§4.1, §5).
//!
//! Walks the repository tree respecting `.gitignore`, applies optional
//! include/exclude globs, and returns paths in a fixed order: filesystem
//! iteration order is not guaranteed, so every caller sorts by path before
//! handing files to the parser stage (§5 ordering guarantees).

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

use crate::models::error::{SynapseError, SynapseResult};
use crate::services::file_classifier::{FileClassifier, ParseDecision};

#[derive(Debug, Clone, Default)]
pub struct WalkConfig {
    pub include_globs: Vec<String>,
    pub exclude_globs: Vec<String>,
}

fn build_globset(patterns: &[String]) -> SynapseResult<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for p in patterns {
        let glob = Glob::new(p).map_err(|e| SynapseError::Config {
            detail: format!("invalid glob {p:?}: {e}"),
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map(Some)
        .map_err(|e| SynapseError::Config {
            detail: format!("invalid glob set: {e}"),
        })
}

/// Discovers the candidate source files under `root`, respecting
/// `.gitignore` and the include/exclude globs. Returns paths sorted
/// lexicographically for deterministic hand-off to the parser stage.
pub fn discover_files(root: &Path, config: &WalkConfig) -> SynapseResult<Vec<PathBuf>> {
    let include = build_globset(&config.include_globs)?;
    let exclude = build_globset(&config.exclude_globs)?;
    let classifier = FileClassifier::new();

    let mut files = Vec::new();
    let walker = WalkBuilder::new(root).hidden(false).git_ignore(true).build();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue,
        };
        let path = entry.path();
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let rel = path.strip_prefix(root).unwrap_or(path);
        if let Some(set) = &include {
            if !set.is_match(rel) {
                continue;
            }
        }
        if let Some(set) = &exclude {
            if set.is_match(rel) {
                continue;
            }
        }
        if !is_supported_extension(path) {
            continue;
        }
        if let Ok(content) = std::fs::read(path) {
            if let ParseDecision::Skip(_) = classifier.should_parse(path, &content) {
                continue;
            }
        } else {
            continue;
        }
        files.push(path.to_path_buf());
    }

    files.sort();
    Ok(files)
}

fn is_supported_extension(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("rs") | Some("py")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn discovers_supported_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.py"), "def f():\n    pass\n").unwrap();
        fs::write(dir.path().join("a.rs"), "fn main() {}\n").unwrap();
        fs::write(dir.path().join("c.txt"), "irrelevant").unwrap();

        let files = discover_files(dir.path(), &WalkConfig::default()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.rs", "b.py"]);
    }

    #[test]
    fn exclude_glob_filters_matches() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("vendor")).unwrap();
        fs::write(dir.path().join("vendor/lib.py"), "x = 1\n").unwrap();
        fs::write(dir.path().join("main.py"), "x = 1\n").unwrap();

        let config = WalkConfig {
            include_globs: vec![],
            exclude_globs: vec!["vendor/**".to_string()],
        };
        let files = discover_files(dir.path(), &config).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("main.py"));
    }
}
