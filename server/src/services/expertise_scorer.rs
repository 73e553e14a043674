//! Expertise scorer (§2 step 7, §4.7): per-(developer, file) scoring,
//! bus-factor, and knowledge-gap heatmaps.

use rustc_hash::FxHashMap;
use std::collections::BTreeMap;

use crate::models::commit::{CommitClassification, CommitHistory};
use crate::models::expertise::{ExpertiseFactors, ExpertiseScore, FileExpertiseSummary};

const RECENCY_HALF_LIFE_DAYS: f64 = 90.0;

/// Scores every (developer, file) pair that appears in `history`, grouped
/// by file. Developers who never touched a file get no entry for it (§4.7
/// only defines the factors in terms of commits that exist).
pub fn score_all(history: &CommitHistory, now: chrono::DateTime<chrono::Utc>) -> Vec<FileExpertiseSummary> {
    let mut per_file_commits: BTreeMap<&str, Vec<(&str, &crate::models::commit::CommitRecord, &crate::models::commit::FileHunkStats)>> =
        BTreeMap::new();

    for commit in &history.commits {
        for file in &commit.files {
            per_file_commits
                .entry(file.path.as_str())
                .or_default()
                .push((commit.author.email.as_str(), commit, file));
        }
    }

    let mut summaries = Vec::new();
    for (file_path, entries) in per_file_commits {
        let commits_total: u32 = entries.len() as u32;
        let lines_total: u64 = entries
            .iter()
            .map(|(_, _, f)| (f.lines_added + f.lines_deleted) as u64)
            .sum();

        let mut per_dev: FxHashMap<&str, DevAccum> = FxHashMap::default();
        for (email, commit, hunk) in &entries {
            let accum = per_dev.entry(email).or_default();
            accum.commits += 1;
            accum.lines += (hunk.lines_added + hunk.lines_deleted) as u64;
            match commit.classification {
                CommitClassification::Refactor => {
                    accum.refactor_commits += 1;
                    accum.refactor_lines += (hunk.lines_added + hunk.lines_deleted) as u64;
                }
                CommitClassification::Architectural => accum.architectural_commits += 1,
                CommitClassification::Bugfix => accum.bugfix_commits += 1,
                CommitClassification::Routine => {}
            }
            if accum.last_commit.map(|t| commit.timestamp > t).unwrap_or(true) {
                accum.last_commit = Some(commit.timestamp);
            }
        }

        let mut scores: Vec<ExpertiseScore> = per_dev
            .into_iter()
            .map(|(email, accum)| {
                let days_since = (now - accum.last_commit.unwrap_or(now)).num_seconds() as f64 / 86_400.0;
                let factors = ExpertiseFactors {
                    commit_frequency: (accum.commits as f64 / commits_total.max(1) as f64).min(1.0),
                    lines_changed: if lines_total == 0 {
                        0.0
                    } else {
                        (accum.lines as f64 / lines_total as f64).min(1.0)
                    },
                    refactor_depth: if accum.commits == 0 {
                        0.0
                    } else {
                        (accum.refactor_commits as f64 / accum.commits as f64)
                            * (accum.refactor_lines as f64 / accum.lines.max(1) as f64).min(1.0)
                    },
                    architectural_changes: if accum.commits == 0 {
                        0.0
                    } else {
                        accum.architectural_commits as f64 / accum.commits as f64
                    },
                    bug_fixes: if accum.commits == 0 {
                        0.0
                    } else {
                        accum.bugfix_commits as f64 / accum.commits as f64
                    },
                    recency: (-days_since.max(0.0) / RECENCY_HALF_LIFE_DAYS).exp(),
                    code_review_participation: 0.0,
                };
                let total = factors.weighted_total();
                let confidence = (accum.commits as f64 / 10.0).min(1.0);
                ExpertiseScore {
                    developer_email: email.to_string(),
                    file_path: file_path.to_string(),
                    factors,
                    total,
                    confidence,
                }
            })
            .collect();

        scores.sort_by(|a, b| {
            b.total
                .total_cmp(&a.total)
                .then_with(|| a.developer_email.cmp(&b.developer_email))
        });

        let bus_factor = compute_bus_factor(&scores);
        let has_knowledge_gap = bus_factor <= 1 || scores.first().map(|s| s.total).unwrap_or(0.0) < 0.3;

        summaries.push(FileExpertiseSummary {
            file_path: file_path.to_string(),
            scores,
            bus_factor,
            has_knowledge_gap,
        });
    }

    summaries
}

#[derive(Default)]
struct DevAccum {
    commits: u32,
    lines: u64,
    refactor_commits: u32,
    refactor_lines: u64,
    architectural_commits: u32,
    bugfix_commits: u32,
    last_commit: Option<chrono::DateTime<chrono::Utc>>,
}

/// Smallest `k` such that the top-`k` developers by score cover at least
/// half of the summed score on this file (§4.7, §8).
fn compute_bus_factor(sorted_desc: &[ExpertiseScore]) -> usize {
    let total: f64 = sorted_desc.iter().map(|s| s.total).sum();
    if total <= 0.0 {
        return 0;
    }
    let mut running = 0.0;
    for (k, score) in sorted_desc.iter().enumerate() {
        running += score.total;
        if running / total >= 0.5 {
            return k + 1;
        }
    }
    sorted_desc.len()
}

#[derive(Debug, Clone, Default)]
pub struct ModuleHeatmap {
    pub modules: BTreeMap<String, crate::models::expertise::ModuleHeatmapEntry>,
    pub average_bus_factor: f64,
}

/// Aggregates per-file summaries into the per-top-level-module heatmap
/// (§4.7, §6).
pub fn heatmap(summaries: &[FileExpertiseSummary]) -> ModuleHeatmap {
    let mut by_module: BTreeMap<&str, Vec<&FileExpertiseSummary>> = BTreeMap::new();
    for summary in summaries {
        let module = summary.file_path.split('/').next().unwrap_or(&summary.file_path);
        by_module.entry(module).or_default().push(summary);
    }

    let mut modules = BTreeMap::new();
    let mut bus_factor_sum = 0usize;
    for (module, files) in &by_module {
        let bus_factor = files.iter().map(|f| f.bus_factor).min().unwrap_or(0);
        let expert_count = files
            .iter()
            .flat_map(|f| f.scores.iter())
            .filter(|s| s.total >= 0.3)
            .map(|s| s.developer_email.as_str())
            .collect::<std::collections::HashSet<_>>()
            .len();
        let has_gap = files.iter().any(|f| f.has_knowledge_gap);
        bus_factor_sum += bus_factor;
        modules.insert(
            module.to_string(),
            crate::models::expertise::ModuleHeatmapEntry {
                bus_factor,
                expert_count,
                has_gap,
                file_count: files.len(),
            },
        );
    }

    let average_bus_factor = if by_module.is_empty() {
        0.0
    } else {
        bus_factor_sum as f64 / by_module.len() as f64
    };

    ModuleHeatmap {
        modules,
        average_bus_factor,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::commit::{CommitAuthor, CommitRecord, FileHunkStats};
    use chrono::{Duration, Utc};

    fn commit(
        email: &str,
        classification: CommitClassification,
        path: &str,
        added: u32,
        deleted: u32,
        at: chrono::DateTime<Utc>,
    ) -> CommitRecord {
        CommitRecord {
            hash: "deadbeef".into(),
            author: CommitAuthor {
                name: email.to_string(),
                email: email.to_string(),
            },
            timestamp: at,
            message: "msg".into(),
            classification,
            files: vec![FileHunkStats {
                path: path.into(),
                lines_added: added,
                lines_deleted: deleted,
            }],
        }
    }

    #[test]
    fn single_dominant_developer_yields_bus_factor_one_with_gap() {
        let now = Utc::now();
        let history = CommitHistory {
            commits: vec![
                commit("alice@x.com", CommitClassification::Routine, "f.py", 50, 0, now),
                commit("bob@x.com", CommitClassification::Routine, "f.py", 2, 0, now),
                commit("carol@x.com", CommitClassification::Routine, "f.py", 1, 0, now),
            ],
            developers: Default::default(),
        };
        let summaries = score_all(&history, now);
        let f = summaries.iter().find(|s| s.file_path == "f.py").unwrap();
        assert_eq!(f.bus_factor, 1);
        assert!(f.has_knowledge_gap);
    }

    #[test]
    fn refactor_commits_increase_refactor_depth_and_total() {
        let now = Utc::now();
        let mut commits = Vec::new();
        for i in 0..5 {
            commits.push(commit(
                "dev@x.com",
                CommitClassification::Routine,
                "f.py",
                5,
                5,
                now - Duration::days(10 + i),
            ));
        }
        let before = score_all(
            &CommitHistory {
                commits: commits.clone(),
                developers: Default::default(),
            },
            now,
        );
        commits.push(commit(
            "dev@x.com",
            CommitClassification::Refactor,
            "f.py",
            200,
            200,
            now,
        ));
        commits.push(commit(
            "dev@x.com",
            CommitClassification::Refactor,
            "f.py",
            200,
            200,
            now,
        ));
        let after = score_all(
            &CommitHistory {
                commits,
                developers: Default::default(),
            },
            now,
        );

        let before_total = before[0].scores[0].total;
        let after_total = after[0].scores[0].total;
        assert!(after[0].scores[0].factors.refactor_depth > 0.0);
        assert!(after_total >= before_total);
    }

    #[test]
    fn recency_decays_strictly_with_elapsed_time() {
        let now = Utc::now();
        let history_recent = CommitHistory {
            commits: vec![commit(
                "dev@x.com",
                CommitClassification::Routine,
                "f.py",
                1,
                0,
                now,
            )],
            developers: Default::default(),
        };
        let history_old = CommitHistory {
            commits: vec![commit(
                "dev@x.com",
                CommitClassification::Routine,
                "f.py",
                1,
                0,
                now - Duration::days(180),
            )],
            developers: Default::default(),
        };
        let recent = score_all(&history_recent, now)[0].scores[0].factors.recency;
        let old = score_all(&history_old, now)[0].scores[0].factors.recency;
        assert!(recent > old);
    }
}
