//! Cross-file call/inheritance resolution (§4.3).
//!
//! Turns the raw textual call and base-class sites the parser stage
//! collected into `Relationship` edges between real entity IDs, inventing
//! a synthetic `ExternalRef` node for anything that can't be traced back
//! into the project (third-party calls, stdlib calls, typos).

use rustc_hash::FxHashMap;

use crate::models::entity::{Entity, EntityKind, Signature, SourceLocation};
use crate::models::project_index::{ImportTable, ProjectIndex, RawCallSite, RawInheritSite};
use crate::models::relationship::{Relationship, RelationshipAttrs, RelationshipKind};

/// Output of the resolver: the synthetic external-ref entities it had to
/// invent, the relationship edges it produced, and any non-fatal warnings
/// (star-import name collisions, §9 Open Question).
pub struct ResolveOutput {
    pub synthetic_entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
    pub warnings: Vec<String>,
}

struct ModuleIndex<'a> {
    /// dotted module name -> file path, e.g. "pkg.sub" -> "pkg/sub.py"
    module_to_file: FxHashMap<String, &'a str>,
    index: &'a ProjectIndex,
}

impl<'a> ModuleIndex<'a> {
    fn build(index: &'a ProjectIndex) -> Self {
        let mut module_to_file = FxHashMap::default();
        for file in index.iter() {
            module_to_file.insert(module_name_for(&file.path), file.path.as_str());
        }
        Self {
            module_to_file,
            index,
        }
    }

    /// Longest-prefix match of a dotted name against known module names,
    /// returning `(file_path, remainder_qualified_name)`. The remainder is
    /// empty when the dotted name refers to the module itself.
    fn resolve_prefix(&self, dotted: &str) -> Option<(&'a str, String)> {
        let parts: Vec<&str> = dotted.split('.').collect();
        for split in (1..=parts.len()).rev() {
            let candidate = parts[..split].join(".");
            if let Some(&file) = self.module_to_file.get(&candidate) {
                let remainder = parts[split..].join(".");
                return Some((file, remainder));
            }
        }
        None
    }

    fn entity_with_qname(&self, file: &str, qname: &str) -> Option<&'a Entity> {
        self.index
            .get(file)?
            .entities
            .iter()
            .find(|e| e.qualified_name == qname)
    }
}

fn module_name_for(path: &str) -> String {
    let without_ext = path.rsplit_once('.').map(|(stem, _)| stem).unwrap_or(path);
    without_ext.replace('/', ".")
}

pub fn resolve(index: &ProjectIndex) -> ResolveOutput {
    let modules = ModuleIndex::build(index);
    let mut relationships = Vec::new();
    let mut synthetic = FxHashMap::default();
    let mut warnings = Vec::new();

    for file in index.iter() {
        for call in &file.raw_calls {
            resolve_one(
                &modules,
                file.path.as_str(),
                &file.imports,
                call.caller_id.as_str(),
                &call.callee_name,
                call.line,
                RelationshipKind::Calls,
                &mut relationships,
                &mut synthetic,
                &mut warnings,
            );
        }
        for inherit in &file.raw_inherits {
            resolve_one(
                &modules,
                file.path.as_str(),
                &file.imports,
                inherit.class_id.as_str(),
                &inherit.base_name,
                inherit.line,
                RelationshipKind::Inherits,
                &mut relationships,
                &mut synthetic,
                &mut warnings,
            );
        }
    }

    ResolveOutput {
        synthetic_entities: synthetic.into_values().collect(),
        relationships,
        warnings,
    }
}

#[allow(clippy::too_many_arguments)]
fn resolve_one(
    modules: &ModuleIndex<'_>,
    caller_file: &str,
    imports: &ImportTable,
    source_id: &str,
    callee_name: &str,
    line: u32,
    kind: RelationshipKind,
    relationships: &mut Vec<Relationship>,
    synthetic: &mut FxHashMap<String, Entity>,
    warnings: &mut Vec<String>,
)  {
    let target_id = if let Some((head, rest)) = callee_name.split_once('.') {
        resolve_dotted(modules, imports, head, rest, callee_name)
    } else {
        resolve_unqualified(modules, caller_file, source_id, callee_name, warnings)
    };

    let (target_id, kind) = match target_id {
        Some(target_id) => (target_id, kind),
        None => {
            let ext_id = format!("external:{callee_name}");
            synthetic.entry(ext_id.clone()).or_insert_with(|| Entity {
                id: ext_id.clone(),
                kind: EntityKind::Module,
                qualified_name: callee_name.to_string(),
                location: SourceLocation {
                    file: "<external>".to_string(),
                    start_line: 0,
                    end_line: 0,
                },
                signature: Signature::default(),
                cyclomatic_complexity: 0,
                cognitive_complexity: 0,
                owning_class: None,
            });
            (ext_id, RelationshipKind::ExternalRef)
        }
    };

    relationships.push(Relationship::new(
        source_id,
        target_id,
        kind,
        RelationshipAttrs::at_line(line),
    ));
}

fn resolve_dotted(
    modules: &ModuleIndex<'_>,
    imports: &ImportTable,
    head: &str,
    rest: &str,
    full_name: &str,
) -> Option<String> {
    if let Some(canonical) = imports.resolve_alias(head) {
        let full = if rest.is_empty() {
            canonical.to_string()
        } else {
            format!("{canonical}.{rest}")
        };
        if let Some((file, remainder)) = modules.resolve_prefix(&full) {
            let qname = if remainder.is_empty() {
                "<module>".to_string()
            } else {
                remainder
            };
            if let Some(entity) = modules.entity_with_qname(file, &qname) {
                return Some(entity.id.clone());
            }
        }
        return None;
    }

    // Not an import alias: treat the whole dotted name as a local
    // qualified reference (§4.3 step 1, "else treat as local qualified ref").
    if let Some((file, remainder)) = modules.resolve_prefix(full_name) {
        if let Some(entity) = modules.entity_with_qname(file, &remainder) {
            return Some(entity.id.clone());
        }
    }
    None
}

fn resolve_unqualified(
    modules: &ModuleIndex<'_>,
    caller_file: &str,
    source_id: &str,
    name: &str,
    warnings: &mut Vec<String>,
) -> Option<String> {
    let caller_qname = source_id
        .split_once(':')
        .map(|(_, q)| q)
        .unwrap_or(source_id);
    let parts: Vec<&str> = caller_qname.split('.').collect();

    // Enclosing function/class scopes, innermost first.
    for depth in (1..parts.len()).rev() {
        let candidate = format!("{}.{}", parts[..depth].join("."), name);
        if let Some(entity) = modules.entity_with_qname(caller_file, &candidate) {
            return Some(entity.id.clone());
        }
    }

    // Module-level entity in the same file.
    if let Some(entity) = modules.entity_with_qname(caller_file, name) {
        return Some(entity.id.clone());
    }

    // Star imports, in file order; first match wins but a collision across
    // more than one star-imported module is surfaced as a warning (§9).
    let file = modules.index.get(caller_file)?;
    let mut matches = Vec::new();
    for star_module in &file.imports.star_imports {
        if let Some((star_file, _)) = modules.resolve_prefix(star_module) {
            if let Some(entity) = modules.entity_with_qname(star_file, name) {
                matches.push(entity.id.clone());
            }
        }
    }
    if matches.len() > 1 {
        warnings.push(format!(
            "ambiguous star import: `{name}` is exported by {} modules visible from {caller_file}; picked the first in file order",
            matches.len()
        ));
    }
    matches.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::entity::Entity as E;
    use crate::models::project_index::ParsedFile;

    fn entity(file: &str, qname: &str, kind: EntityKind) -> E {
        E {
            id: E::make_id(file, qname),
            kind,
            qualified_name: qname.to_string(),
            location: SourceLocation {
                file: file.to_string(),
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
    fn resolves_call_via_explicit_import_alias() {
        let mut b = ParsedFile::new("b.py");
        b.entities.push(entity("b.py", "bar", EntityKind::Function));

        let mut a = ParsedFile::new("a.py");
        a.entities.push(entity("a.py", "foo", EntityKind::Function));
        a.imports.aliases.insert("bar".to_string(), "b.bar".to_string());
        a.raw_calls.push(RawCallSite {
            caller_id: E::make_id("a.py", "foo"),
            callee_name: "bar".to_string(),
            line: 3,
        });

        let index = ProjectIndex::build(vec![a, b]);
        let out = resolve(&index);
        assert_eq!(out.relationships.len(), 1);
        assert_eq!(out.relationships[0].target_id, E::make_id("b.py", "bar"));
        assert_eq!(out.relationships[0].kind, RelationshipKind::Calls);
    }

    #[test]
    fn resolves_call_via_star_import() {
        let mut b = ParsedFile::new("b.py");
        b.entities.push(entity("b.py", "bar", EntityKind::Function));

        let mut a = ParsedFile::new("a.py");
        a.entities.push(entity("a.py", "foo", EntityKind::Function));
        a.imports.star_imports.push("b".to_string());
        a.raw_calls.push(RawCallSite {
            caller_id: E::make_id("a.py", "foo"),
            callee_name: "bar".to_string(),
            line: 3,
        });

        let index = ProjectIndex::build(vec![a, b]);
        let out = resolve(&index);
        assert_eq!(out.relationships.len(), 1);
        assert_eq!(out.relationships[0].target_id, E::make_id("b.py", "bar"));
    }

    #[test]
    fn unresolved_call_becomes_external_ref() {
        let mut a = ParsedFile::new("a.py");
        a.entities.push(entity("a.py", "foo", EntityKind::Function));
        a.raw_calls.push(RawCallSite {
            caller_id: E::make_id("a.py", "foo"),
            callee_name: "print".to_string(),
            line: 1,
        });

        let index = ProjectIndex::build(vec![a]);
        let out = resolve(&index);
        assert_eq!(out.relationships.len(), 1);
        assert_eq!(out.relationships[0].kind, RelationshipKind::ExternalRef);
        assert_eq!(out.synthetic_entities.len(), 1);
        assert_eq!(out.synthetic_entities[0].qualified_name, "print");
    }
}
