//! Risk engine (§2 step 5, §4.5): betweenness centrality, multi-factor risk
//! scoring, and blast-radius traversal.

use rustc_hash::FxHashMap;
use std::collections::VecDeque;

use crate::models::condensed::RiskLevel;
use crate::models::config::AnalysisConfig;
use crate::models::graph::GraphSnapshot;
use crate::models::relationship::RelationshipKind;

/// Weights from the risk-factor table (§4.5). Order matches the table so a
/// reviewer can check the two side by side.
const WEIGHT_COMPLEXITY: f64 = 0.25;
const WEIGHT_CENTRALITY: f64 = 0.20;
const WEIGHT_TEST_COVERAGE: f64 = 0.20;
const WEIGHT_DEPENDENCY: f64 = 0.15;
const WEIGHT_CHANGE_FREQUENCY: f64 = 0.10;
const WEIGHT_BUS_FACTOR: f64 = 0.10;

#[derive(Debug, Clone, Copy, Default)]
pub struct RiskFactors {
    pub complexity_risk: f64,
    pub centrality_risk: f64,
    pub test_coverage_risk: f64,
    pub dependency_risk: f64,
    pub change_frequency_risk: f64,
    pub bus_factor_risk: f64,
}

impl RiskFactors {
    pub fn weighted_score(&self) -> f64 {
        self.complexity_risk * WEIGHT_COMPLEXITY
            + self.centrality_risk * WEIGHT_CENTRALITY
            + self.test_coverage_risk * WEIGHT_TEST_COVERAGE
            + self.dependency_risk * WEIGHT_DEPENDENCY
            + self.change_frequency_risk * WEIGHT_CHANGE_FREQUENCY
            + self.bus_factor_risk * WEIGHT_BUS_FACTOR
    }

    /// The factor contributing the most weighted risk, used to key the
    /// recommendation rubric (§4.5).
    pub fn dominant_factor(&self) -> &'static str {
        let weighted = [
            ("complexity_risk", self.complexity_risk * WEIGHT_COMPLEXITY),
            ("centrality_risk", self.centrality_risk * WEIGHT_CENTRALITY),
            (
                "test_coverage_risk",
                self.test_coverage_risk * WEIGHT_TEST_COVERAGE,
            ),
            ("dependency_risk", self.dependency_risk * WEIGHT_DEPENDENCY),
            (
                "change_frequency_risk",
                self.change_frequency_risk * WEIGHT_CHANGE_FREQUENCY,
            ),
            ("bus_factor_risk", self.bus_factor_risk * WEIGHT_BUS_FACTOR),
        ];
        weighted
            .iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(name, _)| *name)
            .unwrap_or("complexity_risk")
    }
}

/// Per-entity inputs the risk engine can't derive from the graph alone
/// (coverage comes from an external report; change/bus-factor come from the
/// git miner and expertise scorer, computed separately so this stage stays
/// pure graph-theory).
#[derive(Debug, Clone, Copy, Default)]
pub struct ExternalRiskInputs {
    pub test_coverage: Option<f64>,
    pub commits_last_90d: u32,
    pub bus_factor: Option<u32>,
}

/// Betweenness centrality over the structural subgraph (CALLS/INHERITS/
/// IMPORTS), via Brandes' algorithm. Graphs above `sample_threshold` nodes
/// sample `sample_size` uniformly-spaced sources and scale by
/// `n / sample_size`, matching §4.5's documented approximation.
pub fn betweenness_centrality(
    graph: &GraphSnapshot,
    sample_threshold: usize,
    sample_size: usize,
) -> Vec<f64> {
    let n = graph.len();
    let mut centrality = vec![0.0_f64; n];
    if n == 0 {
        return centrality;
    }

    let (sources, scale): (Vec<usize>, f64) = if n > sample_threshold {
        let step = (n as f64 / sample_size as f64).max(1.0);
        let sampled: Vec<usize> = (0..sample_size)
            .map(|i| ((i as f64 * step) as usize).min(n - 1))
            .collect();
        (sampled, n as f64 / sample_size as f64)
    } else {
        ((0..n).collect(), 1.0)
    };

    for &s in &sources {
        brandes_single_source(graph, s, &mut centrality);
    }

    for c in &mut centrality {
        *c *= scale;
    }
    centrality
}

fn brandes_single_source(graph: &GraphSnapshot, s: usize, centrality: &mut [f64]) {
    let n = graph.len();
    let mut stack = Vec::new();
    let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut sigma = vec![0.0_f64; n];
    let mut dist = vec![-1_i64; n];
    sigma[s] = 1.0;
    dist[s] = 0;

    let mut queue = VecDeque::new();
    queue.push_back(s);

    while let Some(v) = queue.pop_front() {
        stack.push(v);
        for ri in graph.out_edges(v, true) {
            let w = match graph.entity_index(&graph_edge_target(graph, ri)) {
                Some(idx) => idx,
                None => continue,
            };
            if dist[w] < 0 {
                dist[w] = dist[v] + 1;
                queue.push_back(w);
            }
            if dist[w] == dist[v] + 1 {
                sigma[w] += sigma[v];
                predecessors[w].push(v);
            }
        }
    }

    let mut delta = vec![0.0_f64; n];
    while let Some(w) = stack.pop() {
        for &v in &predecessors[w] {
            delta[v] += (sigma[v] / sigma[w]) * (1.0 + delta[w]);
        }
        if w != s {
            centrality[w] += delta[w];
        }
    }
}

fn graph_edge_target(graph: &GraphSnapshot, relationship_index: usize) -> String {
    graph.relationships[relationship_index].target_id.clone()
}

pub fn risk_factors(
    graph: &GraphSnapshot,
    entity_index: usize,
    centrality_percentile: f64,
    external: &ExternalRiskInputs,
) -> RiskFactors {
    let entity = graph.entity_at(entity_index);
    let complexity_risk = (entity.cyclomatic_complexity as f64 / 15.0).min(1.0) * 0.5
        + (entity.cognitive_complexity as f64 / 20.0).min(1.0) * 0.5;

    let test_coverage_risk = match external.test_coverage {
        Some(coverage) => (1.0 - coverage).clamp(0.0, 1.0),
        None => 1.0,
    };

    let in_degree = graph.in_degree(entity_index, None);
    let out_degree = graph.out_degree(entity_index, None);
    let dependency_risk = ((in_degree + out_degree) as f64 / 20.0).min(1.0);

    let change_frequency_risk = (external.commits_last_90d as f64 / 30.0).min(1.0);

    let bus_factor_risk = match external.bus_factor {
        Some(1) | Some(0) => 1.0,
        Some(2) => 0.6,
        Some(3) => 0.3,
        _ => 0.0,
    };

    RiskFactors {
        complexity_risk,
        centrality_risk: centrality_percentile.clamp(0.0, 1.0),
        test_coverage_risk,
        dependency_risk,
        change_frequency_risk,
        bus_factor_risk,
    }
}

/// Converts raw betweenness values into `[0,1]` percentile ranks so the
/// centrality factor is comparable with the others.
pub fn percentile_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n <= 1 {
        return vec![0.0; n];
    }
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
    let mut ranks = vec![0.0; n];
    for (rank, &idx) in order.iter().enumerate() {
        ranks[idx] = rank as f64 / (n - 1) as f64;
    }
    ranks
}

#[derive(Debug, Clone)]
pub struct BlastRadiusResult {
    pub target: String,
    pub direct_callers: usize,
    pub affected: Vec<String>,
    pub aggregate_risk: f64,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
}

/// BFS over reverse structural edges from `target`, decaying impact weight
/// along each discovery path and dropping anything below the threshold
/// (§4.5). `max_depth`/`max_frontier` are hard caps on the traversal.
pub fn blast_radius(
    graph: &GraphSnapshot,
    target_id: &str,
    risk_scores: &FxHashMap<String, f64>,
    config: &AnalysisConfig,
) -> Option<BlastRadiusResult> {
    let target_index = graph.entity_index(target_id)?;
    let direct_callers = graph.in_degree(target_index, Some(RelationshipKind::Calls));

    let mut visited = FxHashMap::default();
    visited.insert(target_index, 1.0_f64);
    let mut frontier: VecDeque<(usize, usize, f64)> = VecDeque::new();
    frontier.push_back((target_index, 0, 1.0));

    let mut affected = Vec::new();
    while let Some((node, depth, impact)) = frontier.pop_front() {
        if depth >= config.blast_radius_max_depth {
            continue;
        }
        if affected.len() >= config.blast_radius_max_frontier {
            break;
        }
        for ri in graph.in_edges(node, true) {
            let source_id = graph.relationships[ri].source_id.clone();
            let Some(source_index) = graph.entity_index(&source_id) else {
                continue;
            };
            let weight = graph.relationships[ri].attrs.weight.max(0.0).min(1.0);
            let next_impact = impact * weight;
            if next_impact < config.blast_radius_impact_threshold {
                continue;
            }
            if visited.contains_key(&source_index) {
                continue;
            }
            visited.insert(source_index, next_impact);
            affected.push(source_id.clone());
            frontier.push_back((source_index, depth + 1, next_impact));
        }
    }
    affected.sort();

    let aggregate_risk = if affected.is_empty() {
        risk_scores.get(target_id).copied().unwrap_or(0.0)
    } else {
        let sum: f64 = affected
            .iter()
            .map(|id| risk_scores.get(id).copied().unwrap_or(0.0))
            .sum::<f64>()
            + risk_scores.get(target_id).copied().unwrap_or(0.0);
        (sum / (affected.len() as f64 + 1.0)).clamp(0.0, 1.0)
    };
    let risk_level = RiskLevel::from_score(aggregate_risk);

    Some(BlastRadiusResult {
        target: target_id.to_string(),
        direct_callers,
        affected,
        aggregate_risk,
        risk_level,
        recommendations: Vec::new(),
    })
}

/// Fixed rubric keyed on `(level, dominant_factor)` (§4.5). Returns at
/// least one actionable sentence; unknown combinations fall back to a
/// generic review recommendation rather than an empty list.
pub fn recommend(level: RiskLevel, dominant_factor: &str) -> Vec<String> {
    let message = match (level, dominant_factor) {
        (RiskLevel::Critical | RiskLevel::High, "test_coverage_risk") => {
            "Add unit tests before modifying this code."
        }
        (RiskLevel::Critical | RiskLevel::High, "complexity_risk") => {
            "Consider decomposing this function; its complexity is out of proportion to its risk."
        }
        (RiskLevel::Critical | RiskLevel::High, "centrality_risk") => {
            "This entity sits on many call paths; changes here should go through extra review."
        }
        (RiskLevel::Critical | RiskLevel::High, "dependency_risk") => {
            "High fan-in/fan-out; check for a missing abstraction boundary."
        }
        (RiskLevel::Critical | RiskLevel::High, "bus_factor_risk") => {
            "Pair with another contributor before changing this; very few people understand it."
        }
        (RiskLevel::Critical | RiskLevel::High, "change_frequency_risk") => {
            "This code churns often; consider stabilising its interface."
        }
        (RiskLevel::Medium, _) => "Review the diff carefully; this entity carries moderate risk.",
        (RiskLevel::Low, _) => "Low risk; standard review is sufficient.",
        _ => "Review the diff carefully before merging.",
    };
    vec![message.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entity::{Entity, EntityKind, Signature, SourceLocation};
    use crate::models::graph::GraphBuilder;
    use crate::models::relationship::{Relationship, RelationshipAttrs};

    fn entity(id: &str) -> Entity {
        Entity {
            id: id.to_string(),
            kind: EntityKind::Function,
            qualified_name: id.to_string(),
            location: SourceLocation {
                file: "a.py".into(),
                start_line: 1,
                end_line: 1,
            },
            signature: Signature::default(),
            cyclomatic_complexity: 1,
            cognitive_complexity: 0,
            owning_class: None,
        }
    }

    fn chain_graph() -> GraphSnapshot {
        let mut b = GraphBuilder::new();
        b.add_entity(entity("a"));
        b.add_entity(entity("b"));
        b.add_entity(entity("c"));
        b.add_relationship(Relationship::new(
            "a",
            "b",
            RelationshipKind::Calls,
            RelationshipAttrs::at_line(1),
        ));
        b.add_relationship(Relationship::new(
            "b",
            "c",
            RelationshipKind::Calls,
            RelationshipAttrs::at_line(1),
        ));
        b.build(1)
    }

    #[test]
    fn middle_node_has_highest_betweenness_on_a_chain() {
        let graph = chain_graph();
        let centrality = betweenness_centrality(&graph, 2_000, 500);
        let b_index = graph.entity_index("b").unwrap();
        let a_index = graph.entity_index("a").unwrap();
        assert!(centrality[b_index] > centrality[a_index]);
    }

    #[test]
    fn blast_radius_two_file_scenario_matches_spec_example() {
        let mut b = GraphBuilder::new();
        b.add_entity(entity("a.py:foo"));
        b.add_entity(entity("b.py:bar"));
        b.add_relationship(Relationship::new(
            "a.py:foo",
            "b.py:bar",
            RelationshipKind::Calls,
            RelationshipAttrs::at_line(1),
        ));
        let graph = b.build(1);
        let scores = FxHashMap::default();
        let config = AnalysisConfig::default();
        let result = blast_radius(&graph, "b.py:bar", &scores, &config).unwrap();
        assert_eq!(result.direct_callers, 1);
        assert_eq!(result.affected, vec!["a.py:foo".to_string()]);
    }

    #[test]
    fn risk_level_thresholds_match_spec() {
        assert_eq!(RiskLevel::from_score(0.0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.19), RiskLevel::Low);
        assert_eq!(RiskLevel::from_score(0.8), RiskLevel::Critical);
        assert_eq!(RiskLevel::from_score(1.0), RiskLevel::Critical);
    }
}
