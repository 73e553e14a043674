use crate::models::entity::Entity;
use crate::models::relationship::{Relationship, RelationshipKind};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// The closed set of entities and relationships for one analysis run
/// (§3). Never a pointer graph: entities live in a flat `Vec` addressed by
/// small integer indices, with adjacency lists of indices, so mutual
/// recursion and circular imports are just cycles in an adjacency list
/// (Design Notes §9) rather than something `Rc`/`RefCell` has to fight.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub version: u64,
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
    #[serde(skip)]
    id_index: FxHashMap<String, usize>,
    /// Per entity index: relationship indices where that entity is the
    /// source, in edge-insertion order (blast-radius determinism, §4.5).
    #[serde(skip)]
    forward_adj: Vec<Vec<usize>>,
    #[serde(skip)]
    reverse_adj: Vec<Vec<usize>>,
}

impl GraphSnapshot {
    pub fn entity_index(&self, id: &str) -> Option<usize> {
        self.id_index.get(id).copied()
    }

    pub fn entity(&self, id: &str) -> Option<&Entity> {
        self.entity_index(id).map(|i| &self.entities[i])
    }

    pub fn entity_at(&self, index: usize) -> &Entity {
        &self.entities[index]
    }

    pub fn contains(&self, id: &str) -> bool {
        self.id_index.contains_key(id)
    }

    /// Outgoing relationship indices from `index`, in insertion order,
    /// optionally restricted to structural kinds.
    pub fn out_edges(&self, index: usize, structural_only: bool) -> Vec<usize> {
        self.forward_adj[index]
            .iter()
            .copied()
            .filter(|&ri| !structural_only || self.relationships[ri].kind.is_structural())
            .collect()
    }

    pub fn in_edges(&self, index: usize, structural_only: bool) -> Vec<usize> {
        self.reverse_adj[index]
            .iter()
            .copied()
            .filter(|&ri| !structural_only || self.relationships[ri].kind.is_structural())
            .collect()
    }

    pub fn out_degree(&self, index: usize, kind: Option<RelationshipKind>) -> usize {
        self.forward_adj[index]
            .iter()
            .filter(|&&ri| kind.map_or(true, |k| self.relationships[ri].kind == k))
            .count()
    }

    pub fn in_degree(&self, index: usize, kind: Option<RelationshipKind>) -> usize {
        self.reverse_adj[index]
            .iter()
            .filter(|&&ri| kind.map_or(true, |k| self.relationships[ri].kind == k))
            .count()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Every edge endpoint references a node in this snapshot (§3, §8).
    pub fn validate_endpoints(&self) -> bool {
        self.relationships
            .iter()
            .all(|r| self.contains(&r.source_id) && self.contains(&r.target_id))
    }
}

/// Accumulates entities/relationships, then builds the immutable,
/// index-backed snapshot. Edges are deduplicated by `(source, target,
/// kind)`, preserving multiplicity only per kind (§4.4).
#[derive(Debug, Default)]
pub struct GraphBuilder {
    entities: Vec<Entity>,
    relationships: Vec<Relationship>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entity(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    pub fn add_relationship(&mut self, relationship: Relationship) {
        self.relationships.push(relationship);
    }

    pub fn build(mut self, version: u64) -> GraphSnapshot {
        // Sort entities by ID for deterministic indexing across runs with
        // the same file set (§5 ordering guarantees).
        self.entities.sort_by(|a, b| a.id.cmp(&b.id));

        let mut id_index = FxHashMap::default();
        id_index.reserve(self.entities.len());
        for (i, e) in self.entities.iter().enumerate() {
            id_index.insert(e.id.clone(), i);
        }

        let mut seen = std::collections::HashSet::with_capacity(self.relationships.len());
        let mut relationships = Vec::with_capacity(self.relationships.len());
        for r in self.relationships {
            if seen.insert(r.dedup_key()) {
                relationships.push(r);
            }
        }

        let mut forward_adj = vec![Vec::new(); self.entities.len()];
        let mut reverse_adj = vec![Vec::new(); self.entities.len()];
        for (ri, r) in relationships.iter().enumerate() {
            if let Some(&si) = id_index.get(&r.source_id) {
                forward_adj[si].push(ri);
            }
            if let Some(&ti) = id_index.get(&r.target_id) {
                reverse_adj[ti].push(ri);
            }
        }

        GraphSnapshot {
            version,
            entities: self.entities,
            relationships,
            id_index,
            forward_adj,
            reverse_adj,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entity::{EntityKind, Signature, SourceLocation};
    use crate::models::relationship::RelationshipAttrs;

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

    #[test]
    fn edges_dedup_by_source_target_kind() {
        let mut b = GraphBuilder::new();
        b.add_entity(entity("a"));
        b.add_entity(entity("b"));
        b.add_relationship(Relationship::new(
            "a",
            "b",
            RelationshipKind::Calls,
            RelationshipAttrs::at_line(1),
        ));
        b.add_relationship(Relationship::new(
            "a",
            "b",
            RelationshipKind::Calls,
            RelationshipAttrs::at_line(2),
        ));
        let g = b.build(1);
        assert_eq!(g.relationships.len(), 1);
    }

    #[test]
    fn endpoints_always_in_snapshot() {
        let mut b = GraphBuilder::new();
        b.add_entity(entity("a"));
        b.add_entity(entity("b"));
        b.add_relationship(Relationship::new(
            "a",
            "b",
            RelationshipKind::Calls,
            RelationshipAttrs::at_line(1),
        ));
        let g = b.build(1);
        assert!(g.validate_endpoints());
    }

    #[test]
    fn entity_order_is_deterministic() {
        let mut b = GraphBuilder::new();
        b.add_entity(entity("z"));
        b.add_entity(entity("a"));
        let g = b.build(1);
        assert_eq!(g.entities[0].id, "a");
        assert_eq!(g.entities[1].id, "z");
    }
}
