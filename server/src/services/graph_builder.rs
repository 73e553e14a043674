//! Graph builder pipeline stage (§2 step 4, §4.4).
//!
//! Thin driver over `models::graph::GraphBuilder`: feeds it every entity the
//! parser stage produced plus the resolver's synthetic external-ref nodes,
//! then every resolved relationship, and builds the immutable snapshot.

use crate::models::graph::{GraphBuilder, GraphSnapshot};
use crate::models::project_index::ProjectIndex;
use crate::services::resolver::ResolveOutput;

pub fn build(index: &ProjectIndex, resolved: ResolveOutput, version: u64) -> GraphSnapshot {
    let mut builder = GraphBuilder::new();

    for entity in index.all_entities() {
        builder.add_entity(entity.clone());
    }
    for entity in resolved.synthetic_entities {
        builder.add_entity(entity);
    }
    for relationship in resolved.relationships {
        builder.add_relationship(relationship);
    }

    builder.build(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entity::{Entity, EntityKind, Signature, SourceLocation};
    use crate::models::project_index::{ParsedFile, RawCallSite};
    use crate::services::resolver;

    #[test]
    fn builds_snapshot_with_valid_endpoints_from_two_files() {
        let mut b = ParsedFile::new("b.py");
        b.entities.push(Entity {
            id: Entity::make_id("b.py", "bar"),
            kind: EntityKind::Function,
            qualified_name: "bar".into(),
            location: SourceLocation {
                file: "b.py".into(),
                start_line: 1,
                end_line: 1,
            },
            signature: Signature::default(),
            cyclomatic_complexity: 1,
            cognitive_complexity: 0,
            owning_class: None,
        });

        let mut a = ParsedFile::new("a.py");
        a.entities.push(Entity {
            id: Entity::make_id("a.py", "foo"),
            kind: EntityKind::Function,
            qualified_name: "foo".into(),
            location: SourceLocation {
                file: "a.py".into(),
                start_line: 1,
                end_line: 1,
            },
            signature: Signature::default(),
            cyclomatic_complexity: 1,
            cognitive_complexity: 0,
            owning_class: None,
        });
        a.imports.aliases.insert("bar".into(), "b.bar".into());
        a.raw_calls.push(RawCallSite {
            caller_id: Entity::make_id("a.py", "foo"),
            callee_name: "bar".into(),
            line: 2,
        });

        let index = ProjectIndex::build(vec![a, b]);
        let resolved = resolver::resolve(&index);
        let snapshot = build(&index, resolved, 1);

        assert!(snapshot.validate_endpoints());
        assert_eq!(snapshot.relationships.len(), 1);
    }
}
