//! Governance engine (§2 step 8, §4.8): layer classification, boundary
//! rule validation, coupling/cohesion, and drift scoring.

use globset::Glob;

use crate::models::governance::{
    ArchitectureConfig, BoundaryAction, BoundaryRule, DriftMetricsSnapshot, Layer, Violation,
    ViolationSeverity,
};
use crate::models::graph::GraphSnapshot;
use crate::models::relationship::RelationshipKind;

/// Loaded governance configuration, ready to validate a graph against.
pub struct Governance {
    pub layers: Vec<Layer>,
    pub rules: Vec<BoundaryRule>,
}

impl Governance {
    pub fn from_config(config: ArchitectureConfig) -> Self {
        Self {
            layers: config.into_layers(),
            rules: config.into_rules(),
        }
    }

    /// First layer (in the config's declared order) whose any pattern
    /// matches `module_path`, patterns tried in lexicographic order within
    /// a layer for determinism (§4.8).
    pub fn layer_for(&self, module_path: &str) -> Option<&str> {
        self.layers.iter().find_map(|layer| {
            layer
                .patterns
                .iter()
                .any(|p| glob_match(p, module_path))
                .then_some(layer.name.as_str())
        })
    }

    /// First matching rule (declared order; wildcards allowed), or `None`
    /// meaning the default action (allow) applies.
    fn rule_for(&self, from_layer: &str, to_layer: &str) -> Option<&BoundaryRule> {
        self.rules.iter().find(|r| r.matches(from_layer, to_layer))
    }

    /// Validates every IMPORTS edge in `graph` against the layer rules,
    /// returning violations/warnings in graph edge-insertion order (§4.8,
    /// §8 determinism).
    pub fn validate(&self, graph: &GraphSnapshot) -> Vec<Violation> {
        let mut violations = Vec::new();
        for relationship in &graph.relationships {
            if relationship.kind != RelationshipKind::Imports {
                continue;
            }
            let from_module = file_of(graph, &relationship.source_id);
            let to_module = file_of(graph, &relationship.target_id);
            let (Some(from_module), Some(to_module)) = (from_module, to_module) else {
                continue;
            };
            let Some(from_layer) = self.layer_for(from_module) else {
                continue;
            };
            let Some(to_layer) = self.layer_for(to_module) else {
                continue;
            };
            if from_layer == to_layer {
                continue;
            }

            let Some(rule) = self.rule_for(from_layer, to_layer) else {
                continue; // default: allow
            };
            let severity = match rule.action {
                BoundaryAction::Allow => continue,
                BoundaryAction::Warn => ViolationSeverity::Warning,
                BoundaryAction::Block => ViolationSeverity::Error,
            };

            violations.push(Violation {
                rule_name: rule.name.clone(),
                from_module: from_module.to_string(),
                to_module: to_module.to_string(),
                from_layer: from_layer.to_string(),
                to_layer: to_layer.to_string(),
                severity,
                file_path: from_module.to_string(),
                line_number: relationship.attrs.line,
                message: rule.message.clone(),
            });
        }
        violations
    }

    /// Coupling = cross-layer imports / total imports; cohesion = within-
    /// layer imports / total imports; layer balance = per-layer module
    /// share of the total (§4.8).
    pub fn metrics(&self, graph: &GraphSnapshot) -> DriftMetricsSnapshot {
        let import_edges: Vec<_> = graph
            .relationships
            .iter()
            .filter(|r| r.kind == RelationshipKind::Imports)
            .collect();

        let mut cross = 0usize;
        let mut within = 0usize;
        for edge in &import_edges {
            let Some(from_module) = file_of(graph, &edge.source_id) else {
                continue;
            };
            let Some(to_module) = file_of(graph, &edge.target_id) else {
                continue;
            };
            let (Some(from_layer), Some(to_layer)) =
                (self.layer_for(from_module), self.layer_for(to_module))
            else {
                continue;
            };
            if from_layer == to_layer {
                within += 1;
            } else {
                cross += 1;
            }
        }
        let total = (cross + within).max(1) as f64;

        let modules: Vec<&str> = graph
            .entities
            .iter()
            .map(|e| e.file_path())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        let total_modules = modules.len().max(1) as f64;
        let mut layer_balance = std::collections::BTreeMap::new();
        for layer in &self.layers {
            let count = modules
                .iter()
                .filter(|m| self.layer_for(m) == Some(layer.name.as_str()))
                .count();
            layer_balance.insert(layer.name.clone(), count as f64 / total_modules);
        }

        let violation_count = self.validate(graph).len();

        DriftMetricsSnapshot {
            coupling_score: cross as f64 / total,
            cohesion_score: within as f64 / total,
            violation_count,
            layer_balance,
        }
    }
}

fn file_of<'a>(graph: &'a GraphSnapshot, entity_id: &str) -> Option<&'a str> {
    graph.entity(entity_id).map(|e| e.file_path())
}

fn glob_match(pattern: &str, path: &str) -> bool {
    Glob::new(pattern)
        .map(|g| g.compile_matcher().is_match(path))
        .unwrap_or(false)
}

/// `clamp01(0.4·|ΔC_coupling| + 0.3·(ΔViolations/max(baseline,1)) +
/// 0.3·|ΔC_cohesion|)` (§4.8).
pub fn drift_score(current: &DriftMetricsSnapshot, baseline: &DriftMetricsSnapshot) -> f64 {
    let coupling_delta = (current.coupling_score - baseline.coupling_score).abs();
    let violation_delta = (current.violation_count as f64 - baseline.violation_count as f64)
        / baseline.violation_count.max(1) as f64;
    let cohesion_delta = (current.cohesion_score - baseline.cohesion_score).abs();
    (0.4 * coupling_delta + 0.3 * violation_delta + 0.3 * cohesion_delta).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entity::{Entity, EntityKind, Signature, SourceLocation};
    use crate::models::graph::GraphBuilder;
    use crate::models::relationship::{Relationship, RelationshipAttrs};

    fn module_entity(file: &str) -> Entity {
        Entity {
            id: Entity::make_id(file, "<module>"),
            kind: EntityKind::Module,
            qualified_name: "<module>".into(),
            location: SourceLocation {
                file: file.into(),
                start_line: 1,
                end_line: 1,
            },
            signature: Signature::default(),
            cyclomatic_complexity: 0,
            cognitive_complexity: 0,
            owning_class: None,
        }
    }

    #[test]
    fn api_to_data_import_blocked_under_default_config() {
        let mut b = GraphBuilder::new();
        b.add_entity(module_entity("api/main.py"));
        b.add_entity(module_entity("data/models.py"));
        b.add_relationship(Relationship::new(
            Entity::make_id("api/main.py", "<module>"),
            Entity::make_id("data/models.py", "<module>"),
            RelationshipKind::Imports,
            RelationshipAttrs::at_line(1),
        ));
        let graph = b.build(1);

        let governance = Governance::from_config(ArchitectureConfig::default());
        let violations = governance.validate(&graph);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, ViolationSeverity::Error);
    }

    #[test]
    fn service_to_data_import_allowed_under_default_config() {
        let mut b = GraphBuilder::new();
        b.add_entity(module_entity("service/x.py"));
        b.add_entity(module_entity("data/models.py"));
        b.add_relationship(Relationship::new(
            Entity::make_id("service/x.py", "<module>"),
            Entity::make_id("data/models.py", "<module>"),
            RelationshipKind::Imports,
            RelationshipAttrs::at_line(1),
        ));
        let graph = b.build(1);

        let governance = Governance::from_config(ArchitectureConfig::default());
        assert!(governance.validate(&graph).is_empty());
    }

    #[test]
    fn drift_score_matches_spec_example() {
        let baseline = DriftMetricsSnapshot {
            coupling_score: 0.2,
            cohesion_score: 0.7,
            violation_count: 0,
            layer_balance: Default::default(),
        };
        let current = DriftMetricsSnapshot {
            coupling_score: 0.5,
            cohesion_score: 0.55,
            violation_count: 4,
            layer_balance: Default::default(),
        };
        let score = drift_score(&current, &baseline);
        assert!((score - 1.0).abs() < f64::EPSILON);
    }
}
