use serde::{Deserialize, Serialize};

/// Seven weighted factors behind an expertise score, each in `[0,1]`
/// (§4.7). Kept as named fields rather than a map so the monotonicity
/// invariants in §8 can be checked field-by-field without string keys.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ExpertiseFactors {
    pub commit_frequency: f64,
    pub lines_changed: f64,
    pub refactor_depth: f64,
    pub architectural_changes: f64,
    pub bug_fixes: f64,
    pub recency: f64,
    pub code_review_participation: f64,
}

impl ExpertiseFactors {
    pub const WEIGHTS: [(&'static str, f64); 7] = [
        ("commit_frequency", 0.15),
        ("lines_changed", 0.10),
        ("refactor_depth", 0.25),
        ("architectural_changes", 0.20),
        ("bug_fixes", 0.15),
        ("recency", 0.10),
        ("code_review_participation", 0.05),
    ];

    pub fn weighted_total(&self) -> f64 {
        self.commit_frequency * 0.15
            + self.lines_changed * 0.10
            + self.refactor_depth * 0.25
            + self.architectural_changes * 0.20
            + self.bug_fixes * 0.15
            + self.recency * 0.10
            + self.code_review_participation * 0.05
    }
}

/// Per-(developer, file) record carrying the seven factor values plus the
/// weighted total and a confidence (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpertiseScore {
    pub developer_email: String,
    pub file_path: String,
    pub factors: ExpertiseFactors,
    pub total: f64,
    pub confidence: f64,
}

/// Bus-factor(F): smallest `k` such that the top-`k` developers by score
/// cover ≥ 0.5 of the summed score on F (§4.7, §8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileExpertiseSummary {
    pub file_path: String,
    pub scores: Vec<ExpertiseScore>,
    pub bus_factor: usize,
    pub has_knowledge_gap: bool,
}

/// Per top-level module aggregate for the heatmap query (§4.7, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleHeatmapEntry {
    pub bus_factor: usize,
    pub expert_count: usize,
    pub has_gap: bool,
    pub file_count: usize,
}
