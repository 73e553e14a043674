//! Parser pipeline stage (§2 step 1, §4.1, §5).
//!
//! Discovers source files, dispatches each to the matching language
//! backend, and runs the batch with data-parallelism across a worker pool
//! (§5: stage 1 is embarrassingly parallel). A parse failure in one file
//! becomes a contained `PartialFailure` rather than aborting the run; the
//! file is still present downstream, just entityless.

pub mod python;
pub mod rust_lang;
pub mod walker;

use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::models::entity::normalize_path;
use crate::models::error::{PartialFailure, SynapseError};
use crate::models::project_index::{ParsedFile, ProjectIndex};

pub use walker::WalkConfig;

/// Result of running the parser stage over a repository: an immutable
/// project index plus any contained per-file failures (§7).
pub struct ParseRun {
    pub index: ProjectIndex,
    pub failures: Vec<PartialFailure>,
}

/// Parses every discovered file under `root`, each on its own thread-pool
/// task, enforcing `per_file_timeout` as a soft deadline (§5). Files whose
/// extension has no registered backend are skipped silently — the walker
/// only discovers `.rs`/`.py` files in the first place.
pub fn run(root: &Path, walk_config: &WalkConfig, per_file_timeout: Duration) -> Result<ParseRun, SynapseError> {
    let files = walker::discover_files(root, walk_config)?;

    let results: Vec<Result<ParsedFile, PartialFailure>> = files
        .par_iter()
        .map(|path| parse_one_with_timeout(root, path, per_file_timeout))
        .collect();

    let mut parsed = Vec::with_capacity(results.len());
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(file) => parsed.push(file),
            Err(failure) => failures.push(failure),
        }
    }

    Ok(ParseRun {
        index: ProjectIndex::build(parsed),
        failures,
    })
}

fn parse_one_with_timeout(
    root: &Path,
    path: &PathBuf,
    timeout: Duration,
) -> Result<ParsedFile, PartialFailure> {
    let root = root.to_path_buf();
    let path = path.clone();
    let (tx, rx) = mpsc::channel();
    let worker_path = path.clone();
    thread::spawn(move || {
        let _ = tx.send(parse_one(&root, &worker_path));
    });

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(_) => Err(PartialFailure::from_parse_error(
            path.to_string_lossy().into_owned(),
            format!("parse exceeded soft timeout of {:?}", timeout),
        )),
    }
}

fn parse_one(root: &Path, path: &Path) -> Result<ParsedFile, PartialFailure> {
    let normalized = normalize_path(root, path);
    let content = std::fs::read_to_string(path).map_err(|e| {
        PartialFailure::from_parse_error(normalized.clone(), format!("unreadable file: {e}"))
    })?;

    let outcome = match path.extension().and_then(|e| e.to_str()) {
        Some("rs") => rust_lang::parse_source(&normalized, &content),
        Some("py") => python::parse_source(&normalized, &content),
        _ => {
            return Err(PartialFailure::from_parse_error(
                normalized,
                "unsupported file extension",
            ))
        }
    };

    outcome.map_err(|e| PartialFailure::from_parse_error(normalized, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn parses_mixed_repo_and_reports_no_failures() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.rs"), "fn foo() {}\n").unwrap();
        fs::write(dir.path().join("b.py"), "def bar():\n    pass\n").unwrap();

        let run = run(dir.path(), &WalkConfig::default(), Duration::from_secs(5)).unwrap();
        assert!(run.failures.is_empty());
        assert_eq!(run.index.len(), 2);
    }

    #[test]
    fn broken_file_yields_contained_failure_not_abort() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("good.rs"), "fn ok() {}\n").unwrap();
        fs::write(dir.path().join("bad.rs"), "fn ( broken {\n").unwrap();

        let run = run(dir.path(), &WalkConfig::default(), Duration::from_secs(5)).unwrap();
        assert_eq!(run.failures.len(), 1);
        assert_eq!(run.index.len(), 1);
    }
}
