use serde::{Deserialize, Serialize};

/// One case per kind, no inheritance hierarchy (Design Notes §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Function,
    Method,
    Class,
    Module,
    Import,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub file: String,
    pub start_line: u32,
    pub end_line: u32,
}

/// Params, return type, decorators. Only functions/methods carry a non-empty
/// signature; classes and modules leave it default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub params: Vec<String>,
    pub return_type: Option<String>,
    pub decorators: Vec<String>,
}

/// A function, method, class, module, or import identified by a stable ID
/// of the form `<normalised_path>:<qualified_name>` (§3). IDs are unique and
/// path-normalised: POSIX separators, relative to the repository root.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub kind: EntityKind,
    pub qualified_name: String,
    pub location: SourceLocation,
    pub signature: Signature,
    pub cyclomatic_complexity: u32,
    pub cognitive_complexity: u32,
    /// Entity ID of the owning class, methods only.
    pub owning_class: Option<String>,
}

impl Entity {
    /// `<normalised_path>:<qualified_name>`, POSIX-separated, relative to
    /// the repository root. The single place this format is assembled so
    /// every caller stays consistent with the resolver and graph builder.
    pub fn make_id(normalized_path: &str, qualified_name: &str) -> String {
        format!("{normalized_path}:{qualified_name}")
    }

    pub fn file_path(&self) -> &str {
        &self.location.file
    }

    pub fn new_module(normalized_path: &str) -> Self {
        Entity {
            id: Self::make_id(normalized_path, "<module>"),
            kind: EntityKind::Module,
            qualified_name: "<module>".to_string(),
            location: SourceLocation {
                file: normalized_path.to_string(),
                start_line: 1,
                end_line: 1,
            },
            signature: Signature::default(),
            cyclomatic_complexity: 0,
            cognitive_complexity: 0,
            owning_class: None,
        }
    }
}

/// Normalises a filesystem path to POSIX separators relative to a root, per
/// the Open Question on mixed path styles (§9): normalisation happens once,
/// at ingest, and every store that round-trips paths preserves it.
pub fn normalize_path(root: &std::path::Path, path: &std::path::Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn entity_id_is_path_colon_qualified_name() {
        let id = Entity::make_id("a/b.py", "Outer.Inner.method");
        assert_eq!(id, "a/b.py:Outer.Inner.method");
    }

    #[test]
    fn normalize_path_uses_posix_separators() {
        let root = Path::new("/repo");
        let path = Path::new("/repo/src/a.py");
        assert_eq!(normalize_path(root, path), "src/a.py");
    }
}
