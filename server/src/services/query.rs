//! Query surface (§2 step 10, §6): the read-only façade every external
//! caller (CLI, and eventually a TUI/web layer, out of scope here) talks
//! to. Every method here takes an already-built `GraphSnapshot` — nothing
//! in this module mutates the graph.

use std::collections::BTreeMap;
use std::path::Path;

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::models::commit::CommitHistory;
use crate::models::condensed::{CondensedGraph, RiskLevel};
use crate::models::config::AnalysisConfig;
use crate::models::error::{SynapseError, SynapseResult};
use crate::models::expertise::FileExpertiseSummary;
use crate::models::governance::DriftMetricsSnapshot;
use crate::models::graph::GraphSnapshot;
use crate::services::condenser;
use crate::services::expertise_scorer;
use crate::services::governance_engine::{self, Governance};
use crate::services::risk_engine::{self, BlastRadiusResult, ExternalRiskInputs, RiskFactors};

#[derive(Debug, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub file: String,
    pub line: u32,
    pub complexity: u32,
}

#[derive(Debug, Serialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub kind: String,
}

#[derive(Debug, Serialize)]
pub struct GraphResponse {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

#[derive(Debug, Serialize)]
pub struct RiskFactorsResponse {
    pub complexity_risk: f64,
    pub centrality_risk: f64,
    pub test_coverage_risk: f64,
    pub dependency_risk: f64,
    pub change_frequency_risk: f64,
    pub bus_factor_risk: f64,
}

impl From<RiskFactors> for RiskFactorsResponse {
    fn from(f: RiskFactors) -> Self {
        Self {
            complexity_risk: f.complexity_risk,
            centrality_risk: f.centrality_risk,
            test_coverage_risk: f.test_coverage_risk,
            dependency_risk: f.dependency_risk,
            change_frequency_risk: f.change_frequency_risk,
            bus_factor_risk: f.bus_factor_risk,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BlastRadiusResponse {
    pub target: String,
    pub affected: Vec<String>,
    pub blast_radius_score: f64,
    pub risk_level: RiskLevel,
    pub risk_factors: RiskFactorsResponse,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ExpertResponse {
    pub target: String,
    pub primary_expert: Option<String>,
    pub secondary_experts: Vec<String>,
    pub score: f64,
    pub bus_factor: usize,
    pub recommendation_text: String,
}

#[derive(Debug, Serialize)]
pub struct HeatmapResponse {
    pub modules: BTreeMap<String, crate::models::expertise::ModuleHeatmapEntry>,
    pub risk_areas: Vec<String>,
    pub average_bus_factor: f64,
}

#[derive(Debug, Serialize)]
pub struct BusFactorSummaryResponse {
    pub analysis: BTreeMap<String, usize>,
    pub risk_areas: Vec<String>,
    pub warning_threshold: usize,
}

#[derive(Debug, Serialize)]
pub struct GovernanceValidateResponse {
    pub violations: Vec<crate::models::governance::Violation>,
    pub warnings: Vec<crate::models::governance::Violation>,
    pub total_violations: usize,
    pub total_warnings: usize,
}

#[derive(Debug, Serialize)]
pub struct GovernanceLayerInfo {
    pub name: String,
    pub patterns: Vec<String>,
    pub module_count: usize,
}

#[derive(Debug, Serialize)]
pub struct GovernanceLayersResponse {
    pub layers: Vec<GovernanceLayerInfo>,
}

#[derive(Debug, Serialize)]
pub struct GovernanceDriftResponse {
    pub current: DriftMetricsSnapshot,
    pub baseline: DriftMetricsSnapshot,
    pub drift_score: f64,
    pub recommendations: Vec<String>,
}

/// Precomputed per-entity risk the risk engine produced; query time is
/// just lookups and BFS, never recomputation (§5: graph is read-only once
/// built).
pub struct RiskIndex {
    pub scores: FxHashMap<String, f64>,
    pub factors: FxHashMap<String, RiskFactors>,
}

pub fn build_risk_index(
    graph: &GraphSnapshot,
    config: &AnalysisConfig,
    external: impl Fn(&str) -> ExternalRiskInputs,
) -> RiskIndex {
    let centrality = risk_engine::betweenness_centrality(
        graph,
        config.centrality_sample_threshold,
        config.centrality_sample_size,
    );
    let percentiles = risk_engine::percentile_ranks(&centrality);

    let mut scores = FxHashMap::default();
    let mut factors = FxHashMap::default();
    for (index, entity) in graph.entities.iter().enumerate() {
        let inputs = external(&entity.id);
        let f = risk_engine::risk_factors(graph, index, percentiles[index], &inputs);
        scores.insert(entity.id.clone(), f.weighted_score());
        factors.insert(entity.id.clone(), f);
    }
    RiskIndex { scores, factors }
}

pub struct QueryEngine {
    pub graph: GraphSnapshot,
    pub governance: Governance,
    pub commit_history: CommitHistory,
    pub expertise: Vec<FileExpertiseSummary>,
    pub risk: RiskIndex,
    pub config: AnalysisConfig,
}

impl QueryEngine {
    pub fn get_graph(&self) -> GraphResponse {
        let nodes = self
            .graph
            .entities
            .iter()
            .map(|e| GraphNode {
                id: e.id.clone(),
                name: e.qualified_name.clone(),
                kind: format!("{:?}", e.kind).to_lowercase(),
                file: e.file_path().to_string(),
                line: e.location.start_line,
                complexity: e.cyclomatic_complexity,
            })
            .collect();
        let edges = self
            .graph
            .relationships
            .iter()
            .map(|r| GraphEdge {
                source: r.source_id.clone(),
                target: r.target_id.clone(),
                kind: format!("{:?}", r.kind).to_lowercase(),
            })
            .collect();
        GraphResponse { nodes, edges }
    }

    pub fn get_condensed_graph(&self) -> CondensedGraph {
        let risk: BTreeMap<String, f64> = self.risk.scores.clone().into_iter().collect();
        condenser::condense(&self.graph, &risk)
    }

    pub fn blast_radius(&self, entity_id: &str) -> SynapseResult<BlastRadiusResponse> {
        if entity_id.trim().is_empty() {
            return Err(SynapseError::validation("entity id must not be empty"));
        }
        let result: BlastRadiusResult =
            risk_engine::blast_radius(&self.graph, entity_id, &self.risk.scores, &self.config)
                .ok_or_else(|| SynapseError::not_found(format!("entity {entity_id}")))?;

        let factors = self
            .risk
            .factors
            .get(entity_id)
            .copied()
            .unwrap_or_default();
        let recommendations = risk_engine::recommend(result.risk_level, factors.dominant_factor());

        Ok(BlastRadiusResponse {
            target: result.target,
            affected: result.affected,
            blast_radius_score: result.aggregate_risk,
            risk_level: result.risk_level,
            risk_factors: factors.into(),
            recommendations,
        })
    }

    pub fn expert_for(&self, file_path: &str) -> SynapseResult<ExpertResponse> {
        if file_path.trim().is_empty() {
            return Err(SynapseError::validation("file path must not be empty"));
        }
        let summary = self
            .expertise
            .iter()
            .find(|s| s.file_path == file_path)
            .ok_or_else(|| SynapseError::not_found(format!("no history for {file_path}")))?;

        let primary_expert = summary.scores.first().map(|s| s.developer_email.clone());
        let secondary_experts = summary
            .scores
            .iter()
            .skip(1)
            .take(3)
            .map(|s| s.developer_email.clone())
            .collect();
        let score = summary.scores.first().map(|s| s.total).unwrap_or(0.0);

        let recommendation_text = if summary.has_knowledge_gap {
            format!(
                "Bus factor is {}; consider pairing to spread knowledge of {file_path}.",
                summary.bus_factor
            )
        } else {
            format!("{file_path} has healthy knowledge distribution.")
        };

        Ok(ExpertResponse {
            target: file_path.to_string(),
            primary_expert,
            secondary_experts,
            score,
            bus_factor: summary.bus_factor,
            recommendation_text,
        })
    }

    pub fn heatmap(&self) -> HeatmapResponse {
        let heatmap = expertise_scorer::heatmap(&self.expertise);
        let risk_areas = heatmap
            .modules
            .iter()
            .filter(|(_, m)| m.has_gap)
            .map(|(name, _)| name.clone())
            .collect();
        HeatmapResponse {
            modules: heatmap.modules,
            risk_areas,
            average_bus_factor: heatmap.average_bus_factor,
        }
    }

    pub fn bus_factor_summary(&self, warning_threshold: usize) -> BusFactorSummaryResponse {
        let analysis: BTreeMap<String, usize> = self
            .expertise
            .iter()
            .map(|s| (s.file_path.clone(), s.bus_factor))
            .collect();
        let risk_areas = analysis
            .iter()
            .filter(|(_, &factor)| factor <= warning_threshold)
            .map(|(path, _)| path.clone())
            .collect();
        BusFactorSummaryResponse {
            analysis,
            risk_areas,
            warning_threshold,
        }
    }

    pub fn governance_validate(&self) -> GovernanceValidateResponse {
        let all = self.governance.validate(&self.graph);
        let (violations, warnings): (Vec<_>, Vec<_>) = all.into_iter().partition(|v| {
            matches!(
                v.severity,
                crate::models::governance::ViolationSeverity::Error
                    | crate::models::governance::ViolationSeverity::Critical
            )
        });
        GovernanceValidateResponse {
            total_violations: violations.len(),
            total_warnings: warnings.len(),
            violations,
            warnings,
        }
    }

    pub fn governance_layers(&self) -> GovernanceLayersResponse {
        let modules: Vec<&str> = self
            .graph
            .entities
            .iter()
            .map(|e| e.file_path())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        let layers = self
            .governance
            .layers
            .iter()
            .map(|l| GovernanceLayerInfo {
                name: l.name.clone(),
                patterns: l.patterns.clone(),
                module_count: modules
                    .iter()
                    .filter(|m| self.governance.layer_for(m) == Some(l.name.as_str()))
                    .count(),
            })
            .collect();
        GovernanceLayersResponse { layers }
    }

    pub fn governance_drift(
        &self,
        baseline_path: Option<&Path>,
    ) -> SynapseResult<GovernanceDriftResponse> {
        let current = self.governance.metrics(&self.graph);
        let baseline = match baseline_path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|e| SynapseError::io(path, e))?;
                serde_yaml::from_str(&raw)?
            }
            None => current.clone(),
        };
        let score = governance_engine::drift_score(&current, &baseline);
        let recommendations = if score == 0.0 {
            Vec::new()
        } else {
            vec!["Architecture has drifted from baseline; review recent cross-layer imports.".to_string()]
        };
        Ok(GovernanceDriftResponse {
            current,
            baseline,
            drift_score: score,
            recommendations,
        })
    }
}
