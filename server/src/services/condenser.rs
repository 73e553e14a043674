//! Condenser (§2 step 9, §4.9): directory → file → entity hierarchy
//! projection for visualisation surfaces.

use std::collections::BTreeMap;

use crate::models::condensed::{
    CondensedEdge, CondensedGraph, DirectoryNode, EntityNode, FileNode, RiskLevel,
};
use crate::models::entity::EntityKind;
use crate::models::graph::GraphSnapshot;
use crate::models::relationship::RelationshipKind;

fn directory_of(file_path: &str) -> String {
    match file_path.rsplit_once('/') {
        Some((dir, _)) => dir.to_string(),
        None => String::new(),
    }
}

fn kind_label(kind: EntityKind) -> String {
    match kind {
        EntityKind::Function => "function",
        EntityKind::Method => "method",
        EntityKind::Class => "class",
        EntityKind::Module => "module",
        EntityKind::Import => "import",
    }
    .to_string()
}

/// risk_score per entity, already computed by the risk engine, keyed by
/// entity ID — the condenser only rolls it up, it doesn't compute it.
pub fn condense(graph: &GraphSnapshot, entity_risk: &BTreeMap<String, f64>) -> CondensedGraph {
    let mut entities_by_file: BTreeMap<String, Vec<EntityNode>> = BTreeMap::new();

    for (index, entity) in graph.entities.iter().enumerate() {
        let degree = graph.in_edges(index, true).len() + graph.out_edges(index, true).len();
        let risk_level = RiskLevel::from_score(entity_risk.get(&entity.id).copied().unwrap_or(0.0));
        entities_by_file
            .entry(entity.file_path().to_string())
            .or_default()
            .push(EntityNode {
                id: entity.id.clone(),
                name: entity.qualified_name.clone(),
                kind: kind_label(entity.kind),
                file: entity.file_path().to_string(),
                risk_level,
                complexity: entity.cyclomatic_complexity,
                degree,
            });
    }
    for nodes in entities_by_file.values_mut() {
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
    }

    let mut files_by_directory: BTreeMap<String, Vec<FileNode>> = BTreeMap::new();
    for (file, nodes) in &entities_by_file {
        let directory = directory_of(file);
        let total_complexity: u64 = nodes.iter().map(|n| n.complexity as u64).sum();
        let risk_level = nodes
            .iter()
            .map(|n| n.risk_level)
            .max()
            .unwrap_or(RiskLevel::Low);
        files_by_directory
            .entry(directory.clone())
            .or_default()
            .push(FileNode {
                path: file.clone(),
                directory,
                risk_level,
                total_complexity,
            });
    }
    for nodes in files_by_directory.values_mut() {
        nodes.sort_by(|a, b| a.path.cmp(&b.path));
    }

    let directory_nodes: Vec<DirectoryNode> = files_by_directory
        .iter()
        .map(|(dir, files)| DirectoryNode {
            path: dir.clone(),
            risk_level: files.iter().map(|f| f.risk_level).max().unwrap_or(RiskLevel::Low),
            total_complexity: files.iter().map(|f| f.total_complexity).sum(),
        })
        .collect();

    let entity_edges: Vec<CondensedEdge> = graph
        .relationships
        .iter()
        .filter(|r| r.kind.is_structural())
        .map(|r| CondensedEdge {
            source: r.source_id.clone(),
            target: r.target_id.clone(),
        })
        .collect();

    let file_edges = rollup_edges(graph, |id| graph.entity(id).map(|e| e.file_path().to_string()));
    let directory_edges = rollup_edges(graph, |id| {
        graph
            .entity(id)
            .map(|e| directory_of(e.file_path()))
    });

    CondensedGraph {
        directory_nodes,
        directory_edges,
        files_by_directory,
        file_edges,
        entities_by_file,
        entity_edges,
    }
}

fn rollup_edges(
    graph: &GraphSnapshot,
    key_of: impl Fn(&str) -> Option<String>,
) -> Vec<CondensedEdge> {
    let mut seen = std::collections::HashSet::new();
    let mut edges = Vec::new();
    for relationship in graph.relationships.iter().filter(|r| {
        matches!(
            r.kind,
            RelationshipKind::Calls | RelationshipKind::Inherits | RelationshipKind::Imports
        )
    }) {
        let (Some(source), Some(target)) =
            (key_of(&relationship.source_id), key_of(&relationship.target_id))
        else {
            continue;
        };
        if source == target {
            continue;
        }
        if seen.insert((source.clone(), target.clone())) {
            edges.push(CondensedEdge { source, target });
        }
    }
    edges.sort_by(|a, b| (a.source.clone(), a.target.clone()).cmp(&(b.source.clone(), b.target.clone())));
    edges
}
