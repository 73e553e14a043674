use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::models::error::{SynapseError, SynapseResult};

/// Pipeline-wide thresholds and resource limits, loadable from
/// `<repo>/.synapse/config.yaml` (§A). Falls back to in-code defaults when
/// absent or malformed, per the `ErrConfig` recovery policy (§7).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Above this many nodes, betweenness centrality is sampled (§4.5).
    pub centrality_sample_threshold: usize,
    pub centrality_sample_size: usize,
    /// Per-file soft parse timeout, in seconds (§5).
    pub per_file_timeout_secs: u64,
    /// Overall pipeline deadline, in seconds. `None` means no deadline.
    pub pipeline_deadline_secs: Option<u64>,
    pub worker_pool_size: usize,
    pub blast_radius_max_depth: usize,
    pub blast_radius_max_frontier: usize,
    pub blast_radius_impact_threshold: f64,
    /// Commit-history cutoff window, in days (§4.6).
    pub commit_history_cutoff_days: i64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            centrality_sample_threshold: 2_000,
            centrality_sample_size: 500,
            per_file_timeout_secs: 30,
            pipeline_deadline_secs: None,
            worker_pool_size: num_cpus::get(),
            blast_radius_max_depth: 5,
            blast_radius_max_frontier: 500,
            blast_radius_impact_threshold: 0.1,
            commit_history_cutoff_days: 365,
        }
    }
}

impl AnalysisConfig {
    pub fn load_or_default(repo_root: &Path) -> Self {
        let path = repo_root.join(".synapse").join("config.yaml");
        match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_yaml::from_str(&raw) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!(error = %e, path = %path.display(), "malformed config.yaml, using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn load(path: &Path) -> SynapseResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| SynapseError::io(path, e))?;
        serde_yaml::from_str(&raw).map_err(SynapseError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_values() {
        let cfg = AnalysisConfig::default();
        assert_eq!(cfg.centrality_sample_threshold, 2_000);
        assert_eq!(cfg.blast_radius_max_depth, 5);
        assert_eq!(cfg.blast_radius_max_frontier, 500);
        assert!((cfg.blast_radius_impact_threshold - 0.1).abs() < f64::EPSILON);
        assert_eq!(cfg.commit_history_cutoff_days, 365);
    }

    #[test]
    fn load_or_default_falls_back_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = AnalysisConfig::load_or_default(dir.path());
        assert_eq!(cfg.commit_history_cutoff_days, 365);
    }
}
