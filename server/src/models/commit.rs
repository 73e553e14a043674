use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a commit was classified from its message and diff shape (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitClassification {
    Bugfix,
    Refactor,
    Architectural,
    Routine,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

/// Lines added/deleted for one file within one commit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileHunkStats {
    pub path: String,
    pub lines_added: u32,
    pub lines_deleted: u32,
}

/// `{hash, author, timestamp, classification, per-file stats}` (§3).
/// Classification is a deterministic function of commit metadata + diff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRecord {
    pub hash: String,
    pub author: CommitAuthor,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub classification: CommitClassification,
    pub files: Vec<FileHunkStats>,
}

impl CommitRecord {
    pub fn files_touched_in_commit(&self) -> usize {
        self.files.len()
    }

    pub fn lines_added_total(&self) -> u32 {
        self.files.iter().map(|f| f.lines_added).sum()
    }

    pub fn lines_deleted_total(&self) -> u32 {
        self.files.iter().map(|f| f.lines_deleted).sum()
    }
}

/// Email-keyed developer identity. Different display names observed under
/// the same email are merged into this one profile (§4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeveloperProfile {
    pub email: String,
    pub observed_names: Vec<String>,
    pub first_activity: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub commit_count: usize,
}

impl DeveloperProfile {
    pub fn new(email: impl Into<String>, name: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            email: email.into(),
            observed_names: vec![name.into()],
            first_activity: at,
            last_activity: at,
            commit_count: 0,
        }
    }

    pub fn record_commit(&mut self, name: &str, at: DateTime<Utc>) {
        if !self.observed_names.iter().any(|n| n == name) {
            self.observed_names.push(name.to_string());
        }
        if at < self.first_activity {
            self.first_activity = at;
        }
        if at > self.last_activity {
            self.last_activity = at;
        }
        self.commit_count += 1;
    }
}

/// The set of commit records mined for one repository, with per-developer
/// profiles derived from them (§3 lifecycles: rebuilt with commit records).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitHistory {
    pub commits: Vec<CommitRecord>,
    pub developers: std::collections::BTreeMap<String, DeveloperProfile>,
}
