//! Pure-function complexity calculation over AST subtrees (§4.2).
//!
//! Cyclomatic complexity starts at 1 and adds one per decision point
//! (conditional, loop, boolean short-circuit, exception handler branch,
//! case arm). Cognitive complexity penalises nesting: each additional
//! decision point adds `(1 + nesting_depth)`. Both language visitors
//! (`services::parser::rust_lang`, `services::parser::python`) drive this
//! accumulator rather than duplicating the arithmetic.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ComplexityMetrics {
    pub cyclomatic: u32,
    pub cognitive: u32,
}

/// Tracks nesting depth while a visitor walks a function body and folds
/// each decision point into both scores.
#[derive(Debug, Default)]
pub struct ComplexityAccumulator {
    pub metrics: ComplexityMetrics,
    nesting_depth: u32,
}

impl ComplexityAccumulator {
    pub fn new() -> Self {
        Self {
            metrics: ComplexityMetrics {
                cyclomatic: 1,
                cognitive: 0,
            },
            nesting_depth: 0,
        }
    }

    /// Record a decision point at the current nesting depth (if/match arm/
    /// loop/boolean short-circuit/except clause).
    pub fn decision_point(&mut self) {
        self.metrics.cyclomatic += 1;
        self.metrics.cognitive += 1 + self.nesting_depth;
    }

    /// A boolean short-circuit operator (`&&`, `||`, `and`, `or`) adds a
    /// decision point without changing nesting.
    pub fn boolean_operator(&mut self) {
        self.metrics.cyclomatic += 1;
        self.metrics.cognitive += 1 + self.nesting_depth;
    }

    pub fn enter_nesting(&mut self) {
        self.nesting_depth += 1;
    }

    pub fn exit_nesting(&mut self) {
        self.nesting_depth = self.nesting_depth.saturating_sub(1);
    }
}
