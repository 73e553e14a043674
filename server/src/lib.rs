//! Synapse Graph: a living knowledge graph for source repositories.
//!
//! `models` holds the data shapes (§3); `services` holds the pipeline
//! stages that turn a repository on disk into a queryable `GraphSnapshot`
//! plus governance/expertise/risk overlays (§2).

pub mod models;
pub mod services;

use std::path::Path;
use std::time::Duration;

use rustc_hash::FxHashMap;

use models::config::AnalysisConfig;
use models::error::{PartialFailure, SynapseResult};
use models::governance::ArchitectureConfig;
use services::governance_engine::Governance;
use services::parser::WalkConfig;
use services::query::{self, QueryEngine, RiskIndex};
use services::risk_engine::ExternalRiskInputs;

/// Contained failures from a run, surfaced alongside the successful
/// results rather than aborting the pipeline (§7).
#[derive(Debug, Default)]
pub struct RunSummary {
    pub parse_failures: Vec<PartialFailure>,
    pub resolver_warnings: Vec<String>,
}

/// Runs the full pipeline (§2) over `repo_root` and returns a ready-to-query
/// engine plus a summary of contained failures.
pub fn analyze_repository(repo_root: &Path, version: u64) -> SynapseResult<(QueryEngine, RunSummary)> {
    let config = AnalysisConfig::load_or_default(repo_root);
    let walk_config = WalkConfig::default();

    let parse_run = services::parser::run(
        repo_root,
        &walk_config,
        Duration::from_secs(config.per_file_timeout_secs),
    )?;

    let resolved = services::resolver::resolve(&parse_run.index);
    let warnings = resolved.warnings.clone();
    let graph = services::graph_builder::build(&parse_run.index, resolved, version);

    let architecture_config = load_architecture_config(repo_root);
    let governance = Governance::from_config(architecture_config);

    let commit_history = services::git_miner::mine(
        repo_root,
        config.commit_history_cutoff_days,
        &governance.layers,
    )
    .unwrap_or_default();

    let now = chrono::Utc::now();
    let expertise = services::expertise_scorer::score_all(&commit_history, now);

    let commits_last_90d = commits_per_file_last_90_days(&commit_history, now);
    let bus_factor_by_file: FxHashMap<String, u32> = expertise
        .iter()
        .map(|s| (s.file_path.clone(), s.bus_factor as u32))
        .collect();

    let risk: RiskIndex = query::build_risk_index(&graph, &config, |entity_id| {
        let file = entity_id.split(':').next().unwrap_or(entity_id);
        ExternalRiskInputs {
            test_coverage: None,
            commits_last_90d: commits_last_90d.get(file).copied().unwrap_or(0),
            bus_factor: bus_factor_by_file.get(file).copied(),
        }
    });

    let engine = QueryEngine {
        graph,
        governance,
        commit_history,
        expertise,
        risk,
        config,
    };

    Ok((
        engine,
        RunSummary {
            parse_failures: parse_run.failures,
            resolver_warnings: warnings,
        },
    ))
}

fn load_architecture_config(repo_root: &Path) -> ArchitectureConfig {
    let path = repo_root.join(".synapse").join("architecture.yaml");
    match std::fs::read_to_string(&path) {
        Ok(raw) => match serde_yaml::from_str(&raw) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::warn!(error = %e, path = %path.display(), "malformed architecture.yaml, using defaults");
                ArchitectureConfig::default()
            }
        },
        Err(_) => ArchitectureConfig::default(),
    }
}

/// Resolves the repository root: `SYNAPSE_REPO_ROOT` if set, else the
/// nearest ancestor of `start` containing a `.git` directory, else `start`
/// itself (§6).
pub fn find_repo_root(start: &Path) -> std::path::PathBuf {
    if let Ok(env_root) = std::env::var("SYNAPSE_REPO_ROOT") {
        return std::path::PathBuf::from(env_root);
    }
    let mut current = start;
    loop {
        if current.join(".git").exists() {
            return current.to_path_buf();
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return start.to_path_buf(),
        }
    }
}

fn commits_per_file_last_90_days(
    history: &models::commit::CommitHistory,
    now: chrono::DateTime<chrono::Utc>,
) -> FxHashMap<String, u32> {
    let cutoff = now - chrono::Duration::days(90);
    let mut counts = FxHashMap::default();
    for commit in &history.commits {
        if commit.timestamp < cutoff {
            continue;
        }
        for file in &commit.files {
            *counts.entry(file.path.clone()).or_insert(0) += 1;
        }
    }
    counts
}
