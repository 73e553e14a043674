use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// `[0,0.2)`=LOW, `[0.2,0.5)`=MEDIUM, `[0.5,0.8)`=HIGH, `[0.8,1]`=CRITICAL
    /// (§4.5).
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            RiskLevel::Critical
        } else if score >= 0.5 {
            RiskLevel::High
        } else if score >= 0.2 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryNode {
    pub path: String,
    pub risk_level: RiskLevel,
    pub total_complexity: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileNode {
    pub path: String,
    pub directory: String,
    pub risk_level: RiskLevel,
    pub total_complexity: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityNode {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub file: String,
    pub risk_level: RiskLevel,
    pub complexity: u32,
    pub degree: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CondensedEdge {
    pub source: String,
    pub target: String,
}

/// `{directory_nodes, file_nodes_by_directory, entity_nodes_by_file,
/// entity_edges}` (§4.9, §6) — the directory→file→entity projection used
/// for hierarchical visualisation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CondensedGraph {
    pub directory_nodes: Vec<DirectoryNode>,
    pub directory_edges: Vec<CondensedEdge>,
    pub files_by_directory: std::collections::BTreeMap<String, Vec<FileNode>>,
    pub file_edges: Vec<CondensedEdge>,
    pub entities_by_file: std::collections::BTreeMap<String, Vec<EntityNode>>,
    pub entity_edges: Vec<CondensedEdge>,
}
