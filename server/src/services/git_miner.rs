//! Git history miner (§2 step 6, §4.6).
//!
//! Walks the commit log via `git2` (structured diff access rather than
//! shelling out to `git log`), classifies each commit, and folds commit
//! authors into email-keyed developer profiles.

use chrono::{DateTime, TimeZone, Utc};
use git2::{Delta, Repository};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::path::Path;

use crate::models::commit::{
    CommitAuthor, CommitClassification, CommitHistory, CommitRecord, DeveloperProfile,
    FileHunkStats,
};
use crate::models::error::SynapseResult;
use crate::models::governance::Layer;

static BUGFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(fix|bug|issue|hotfix)\b").unwrap());
static REFACTOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(refactor|clean ?up|restructure|rename)\b").unwrap());

/// Mines up to `cutoff_days` of history from `repo_root`'s default branch.
pub fn mine(repo_root: &Path, cutoff_days: i64, layers: &[Layer]) -> SynapseResult<CommitHistory> {
    let repo = Repository::open(repo_root)?;
    let mut revwalk = repo.revwalk()?;
    revwalk.push_head()?;
    revwalk.set_sorting(git2::Sort::TIME)?;

    let cutoff = Utc::now() - chrono::Duration::days(cutoff_days);
    let mut commits = Vec::new();
    let mut developers = std::collections::BTreeMap::new();

    for oid in revwalk {
        let oid = oid?;
        let commit = repo.find_commit(oid)?;
        let timestamp = git_time_to_utc(commit.time());
        if timestamp < cutoff {
            break;
        }

        let files = diff_stats(&repo, &commit)?;
        let message = commit.message().unwrap_or("").to_string();
        let classification = classify(&message, &files, layers);

        let name = commit.author().name().unwrap_or("unknown").to_string();
        let email = commit
            .author()
            .email()
            .unwrap_or("unknown@unknown")
            .to_string();

        developers
            .entry(email.clone())
            .or_insert_with(|| DeveloperProfile::new(email.clone(), name.clone(), timestamp))
            .record_commit(&name, timestamp);

        commits.push(CommitRecord {
            hash: oid.to_string(),
            author: CommitAuthor { name, email },
            timestamp,
            message,
            classification,
            files,
        });
    }

    // Reverse-chronological walk, stored oldest-first for stable downstream
    // iteration (§4.6 "iterate commit log reverse-chronological" describes
    // the walk direction, not the storage order).
    commits.reverse();

    Ok(CommitHistory {
        commits,
        developers,
    })
}

fn git_time_to_utc(time: git2::Time) -> DateTime<Utc> {
    Utc.timestamp_opt(time.seconds(), 0).single().unwrap_or_else(Utc::now)
}

fn diff_stats(repo: &Repository, commit: &git2::Commit) -> SynapseResult<Vec<FileHunkStats>> {
    let tree = commit.tree()?;
    let parent_tree = commit.parents().next().and_then(|p| p.tree().ok());
    let diff = repo.diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)?;

    let mut files = Vec::new();
    for idx in 0..diff.deltas().count() {
        let delta = diff.get_delta(idx).expect("delta index in range");
        let path = delta
            .new_file()
            .path()
            .or_else(|| delta.old_file().path())
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        if path.is_empty() {
            continue;
        }
        let (_, additions, deletions) = git2::Patch::from_diff(&diff, idx)?
            .map(|mut p| p.line_stats())
            .transpose()?
            .unwrap_or((0, 0, 0));
        files.push(FileHunkStats {
            path,
            lines_added: additions as u32,
            lines_deleted: deletions as u32,
        });
    }
    Ok(files)
}

fn classify(message: &str, files: &[FileHunkStats], layers: &[Layer]) -> CommitClassification {
    if BUGFIX_RE.is_match(message) {
        return CommitClassification::Bugfix;
    }

    let balanced_large_change = files.iter().any(|f| {
        let changed = f.lines_added + f.lines_deleted;
        changed >= 50
            && f.lines_added > 0
            && f.lines_deleted > 0
            && (f.lines_added as f64 - f.lines_deleted as f64).abs()
                <= 0.2 * f.lines_added.max(f.lines_deleted) as f64
    });

    if REFACTOR_RE.is_match(message) || balanced_large_change {
        return CommitClassification::Refactor;
    }

    let distinct_top_level: BTreeSet<&str> = files
        .iter()
        .filter_map(|f| f.path.split('/').next())
        .collect();
    let touches_layer_entry = files.iter().any(|f| {
        layers
            .iter()
            .any(|l| l.patterns.iter().any(|p| glob_match(p, &f.path)))
    });

    if distinct_top_level.len() >= 3 || touches_layer_entry {
        return CommitClassification::Architectural;
    }

    CommitClassification::Routine
}

fn glob_match(pattern: &str, path: &str) -> bool {
    globset::Glob::new(pattern)
        .map(|g| g.compile_matcher().is_match(path))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bugfix_message_classified_as_bugfix() {
        let files = vec![FileHunkStats {
            path: "a.py".into(),
            lines_added: 2,
            lines_deleted: 1,
        }];
        assert_eq!(
            classify("fix null pointer in parser", &files, &[]),
            CommitClassification::Bugfix
        );
    }

    #[test]
    fn refactor_keyword_classified_as_refactor() {
        let files = vec![];
        assert_eq!(
            classify("refactor resolver module", &files, &[]),
            CommitClassification::Refactor
        );
    }

    #[test]
    fn balanced_large_change_classified_as_refactor_without_keyword() {
        let files = vec![FileHunkStats {
            path: "a.py".into(),
            lines_added: 100,
            lines_deleted: 95,
        }];
        assert_eq!(
            classify("tidy things", &files, &[]),
            CommitClassification::Refactor
        );
    }

    #[test]
    fn three_top_level_modules_classified_as_architectural() {
        let files = vec![
            FileHunkStats {
                path: "api/a.py".into(),
                lines_added: 1,
                lines_deleted: 0,
            },
            FileHunkStats {
                path: "service/b.py".into(),
                lines_added: 1,
                lines_deleted: 0,
            },
            FileHunkStats {
                path: "data/c.py".into(),
                lines_added: 1,
                lines_deleted: 0,
            },
        ];
        assert_eq!(
            classify("wire things together", &files, &[]),
            CommitClassification::Architectural
        );
    }

    #[test]
    fn small_unrelated_change_classified_as_routine() {
        let files = vec![FileHunkStats {
            path: "a.py".into(),
            lines_added: 3,
            lines_deleted: 1,
        }];
        assert_eq!(
            classify("tweak default value", &files, &[]),
            CommitClassification::Routine
        );
    }
}
