use serde::{Deserialize, Serialize};

/// Closed enum of edge kinds. CALLS/INHERITS/IMPORTS are the "structural"
/// kinds the risk engine and governance engine restrict themselves to;
/// the rest round out the fourteen kinds (`at least six further structural
/// kinds` beyond the first eight named in §3) a complete graph needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKind {
    Calls,
    Inherits,
    Imports,
    Decorates,
    Returns,
    Raises,
    Uses,
    Contains,
    Overrides,
    Implements,
    Reads,
    Writes,
    Instantiates,
    References,
    ExternalRef,
}

impl RelationshipKind {
    /// Edges the risk engine's centrality pass and the governance engine's
    /// layer validation restrict themselves to (§4.5, §4.8).
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            RelationshipKind::Calls | RelationshipKind::Inherits | RelationshipKind::Imports
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipAttrs {
    pub line: Option<u32>,
    pub weight: f64,
}

impl RelationshipAttrs {
    pub fn at_line(line: u32) -> Self {
        Self {
            line: Some(line),
            weight: 1.0,
        }
    }
}

/// A directed edge `(source_id, target_id, kind, attrs)`. Edges are
/// deduplicated by `(source, target, kind)`; every endpoint must reference a
/// node in the same graph snapshot (§3 invariant).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub source_id: String,
    pub target_id: String,
    pub kind: RelationshipKind,
    pub attrs: RelationshipAttrs,
}

impl Relationship {
    pub fn new(
        source_id: impl Into<String>,
        target_id: impl Into<String>,
        kind: RelationshipKind,
        attrs: RelationshipAttrs,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            target_id: target_id.into(),
            kind,
            attrs,
        }
    }

    pub fn dedup_key(&self) -> (String, String, RelationshipKind) {
        (self.source_id.clone(), self.target_id.clone(), self.kind)
    }
}
