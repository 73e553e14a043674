use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A named partition of module paths, defined by an ordered list of glob
/// patterns (§3). A module belongs to the first layer whose any pattern
/// matches it; within a layer, patterns are tried in lexicographic order
/// for determinism (§4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Layer {
    pub name: String,
    pub patterns: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryAction {
    Allow,
    Warn,
    Block,
}

/// `{from_layer, to_layer, action, message}`. Rules are ordered; first
/// match wins; default action is allow (§3, §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundaryRule {
    pub name: String,
    pub from: String,
    pub to: String,
    pub action: BoundaryAction,
    pub message: String,
}

impl BoundaryRule {
    /// `from`/`to` may be `"*"` as a wildcard layer name.
    pub fn matches(&self, from_layer: &str, to_layer: &str) -> bool {
        (self.from == "*" || self.from == from_layer) && (self.to == "*" || self.to == to_layer)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

/// `{rule_name, from_module, to_module, from_layer, to_layer, severity,
/// file_path, line_number}` (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub rule_name: String,
    pub from_module: String,
    pub to_module: String,
    pub from_layer: String,
    pub to_layer: String,
    pub severity: ViolationSeverity,
    pub file_path: String,
    pub line_number: Option<u32>,
    pub message: String,
}

/// `{coupling_score, cohesion_score, violation_count, per-layer balance}`
/// (§3). The baseline is a stored snapshot of this same shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftMetricsSnapshot {
    pub coupling_score: f64,
    pub cohesion_score: f64,
    pub violation_count: usize,
    pub layer_balance: std::collections::BTreeMap<String, f64>,
}

/// The `.synapse/architecture.yaml` document (§6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchitectureConfig {
    pub layers: OrderedLayerMap,
    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LayerPatterns {
    pub patterns: Vec<String>,
}

/// `layers:` as written in `.synapse/architecture.yaml` is a YAML mapping,
/// but a module belongs to the *first* layer whose pattern matches (§4.8) —
/// a `BTreeMap` would silently re-sort layers alphabetically and make
/// priority order always alphabetical instead of declaration order. This
/// wraps a `Vec` of entries with a hand-written `Deserialize` that walks
/// the YAML map in file order, preserving it.
#[derive(Debug, Clone, Default)]
pub struct OrderedLayerMap(pub Vec<(String, LayerPatterns)>);

impl<'de> Deserialize<'de> for OrderedLayerMap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct OrderedLayerMapVisitor;

        impl<'de> Visitor<'de> for OrderedLayerMapVisitor {
            type Value = OrderedLayerMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of layer name to patterns")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((name, patterns)) = map.next_entry::<String, LayerPatterns>()? {
                    entries.push((name, patterns));
                }
                Ok(OrderedLayerMap(entries))
            }
        }

        deserializer.deserialize_map(OrderedLayerMapVisitor)
    }
}

impl Serialize for OrderedLayerMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, patterns) in &self.0 {
            map.serialize_entry(name, patterns)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    pub name: String,
    pub from: String,
    pub to: String,
    pub action: BoundaryAction,
    #[serde(default)]
    pub message: String,
}

impl Default for ArchitectureConfig {
    /// Defaults when the file is absent: layers `{api, service, data}`;
    /// rule `api → data = block` (§6).
    fn default() -> Self {
        let layers = OrderedLayerMap(vec![
            (
                "api".to_string(),
                LayerPatterns {
                    patterns: vec!["**/api/**".to_string()],
                },
            ),
            (
                "service".to_string(),
                LayerPatterns {
                    patterns: vec!["**/service/**".to_string(), "**/services/**".to_string()],
                },
            ),
            (
                "data".to_string(),
                LayerPatterns {
                    patterns: vec!["**/data/**".to_string()],
                },
            ),
        ]);

        ArchitectureConfig {
            layers,
            rules: vec![RuleConfig {
                name: "api-to-data-blocked".to_string(),
                from: "api".to_string(),
                to: "data".to_string(),
                action: BoundaryAction::Block,
                message: "api layer must not import data layer directly".to_string(),
            }],
        }
    }
}

impl ArchitectureConfig {
    /// Preserves the YAML declaration order of `layers` — priority for
    /// `layer_for` is "first layer in this order whose pattern matches",
    /// not alphabetical (§4.8).
    pub fn into_layers(self) -> Vec<Layer> {
        self.layers
            .0
            .into_iter()
            .map(|(name, p)| {
                let mut patterns = p.patterns;
                patterns.sort();
                Layer { name, patterns }
            })
            .collect()
    }

    pub fn into_rules(self) -> Vec<BoundaryRule> {
        self.rules
            .into_iter()
            .map(|r| BoundaryRule {
                name: r.name,
                from: r.from,
                to: r.to,
                action: r.action,
                message: r.message,
            })
            .collect()
    }
}
