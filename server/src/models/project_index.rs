use crate::models::entity::Entity;
use std::collections::BTreeMap;

/// `import_alias → canonical_module`, plus star-imports kept in file order
/// since the resolver falls back to them, in order, when a name isn't found
/// any other way (§3, §4.3).
#[derive(Debug, Clone, Default)]
pub struct ImportTable {
    pub aliases: BTreeMap<String, String>,
    pub star_imports: Vec<String>,
}

impl ImportTable {
    pub fn resolve_alias(&self, head: &str) -> Option<&str> {
        self.aliases.get(head).map(String::as_str)
    }
}

/// A raw call site as the parser saw it: caller entity ID, callee textual
/// name (possibly dotted), and the line the call appears on (§4.1).
#[derive(Debug, Clone)]
pub struct RawCallSite {
    pub caller_id: String,
    pub callee_name: String,
    pub line: u32,
}

/// A raw class-base reference, resolved by the same rules as call sites
/// (§4.3 "Inherits relationships follow the same resolution rules").
#[derive(Debug, Clone)]
pub struct RawInheritSite {
    pub class_id: String,
    pub base_name: String,
    pub line: u32,
}

/// One file's worth of parser output (§2 step 1, §4.1).
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub path: String,
    pub entities: Vec<Entity>,
    pub imports: ImportTable,
    pub raw_calls: Vec<RawCallSite>,
    pub raw_inherits: Vec<RawInheritSite>,
}

impl ParsedFile {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }
}

/// Mapping from source file to its parsed entities plus its import table.
/// Immutable after build (§3).
#[derive(Debug, Clone, Default)]
pub struct ProjectIndex {
    files: BTreeMap<String, ParsedFile>,
}

impl ProjectIndex {
    pub fn build(mut files: Vec<ParsedFile>) -> Self {
        files.sort_by(|a, b| a.path.cmp(&b.path));
        let mut map = BTreeMap::new();
        for f in files {
            map.insert(f.path.clone(), f);
        }
        Self { files: map }
    }

    pub fn get(&self, path: &str) -> Option<&ParsedFile> {
        self.files.get(path)
    }

    /// Deterministic, path-sorted iteration (§5 ordering guarantees).
    pub fn iter(&self) -> impl Iterator<Item = &ParsedFile> {
        self.files.values()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn all_entities(&self) -> impl Iterator<Item = &Entity> {
        self.files.values().flat_map(|f| f.entities.iter())
    }
}
