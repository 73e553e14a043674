use std::path::PathBuf;
use thiserror::Error;

/// Crate-facing error kinds (§7). Codes are stable identifiers consumed by
/// an embedding HTTP/TUI layer; no JSON-RPC transport is specified here, so
/// `code()` returns a string rather than a numeric RPC code.
#[derive(Error, Debug)]
pub enum SynapseError {
    #[error("configuration error: {detail}")]
    Config { detail: String },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("partial parse failure in {file}: {message}")]
    PartialParse { file: PathBuf, message: String },

    #[error("not found: {what}")]
    NotFound { what: String },

    #[error("invalid input: {detail}")]
    Validation { detail: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("budget exceeded: {operation} hit its hard cap of {limit}")]
    BudgetExceeded { operation: String, limit: usize },

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),
}

impl SynapseError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn validation(detail: impl Into<String>) -> Self {
        Self::Validation {
            detail: detail.into(),
        }
    }

    /// Stable error-code identifier. Never renumber an existing variant;
    /// callers may have persisted these.
    pub fn code(&self) -> &'static str {
        match self {
            SynapseError::Config { .. } => "ErrConfig",
            SynapseError::Io { .. } => "ErrIo",
            SynapseError::PartialParse { .. } => "ErrPartialParse",
            SynapseError::NotFound { .. } => "ErrNotFound",
            SynapseError::Validation { .. } => "ErrValidation",
            SynapseError::Cancelled => "ErrCancelled",
            SynapseError::BudgetExceeded { .. } => "ErrBudgetExceeded",
            SynapseError::Serde(_) => "ErrIo",
            SynapseError::Yaml(_) => "ErrConfig",
            SynapseError::Git(_) => "ErrIo",
        }
    }

    /// Per-file/per-commit errors are recorded and contained; the pipeline
    /// keeps going. Query-time and config errors are not.
    pub fn is_containable(&self) -> bool {
        matches!(self, SynapseError::PartialParse { .. })
    }

    pub fn as_record(&self) -> ErrorRecord {
        ErrorRecord {
            code: self.code().to_string(),
            message: self.to_string(),
            detail: None,
        }
    }
}

/// User-visible failure shape returned by the query surface (§7).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ErrorRecord {
    pub code: String,
    pub message: String,
    pub detail: Option<String>,
}

/// A contained per-file or per-commit failure, accumulated into a run
/// summary rather than aborting the pipeline (§7, §B supplemental).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PartialFailure {
    pub path: String,
    pub code: String,
    pub message: String,
}

impl PartialFailure {
    pub fn from_parse_error(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: file.into(),
            code: "ErrPartialParse".to_string(),
            message: message.into(),
        }
    }
}

pub type SynapseResult<T> = Result<T, SynapseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_stable_per_variant() {
        assert_eq!(SynapseError::Cancelled.code(), "ErrCancelled");
        assert_eq!(
            SynapseError::validation("empty target").code(),
            "ErrValidation"
        );
    }

    #[test]
    fn partial_parse_is_containable() {
        let err = SynapseError::PartialParse {
            file: PathBuf::from("a.py"),
            message: "bad token".into(),
        };
        assert!(err.is_containable());
        assert!(!SynapseError::Cancelled.is_containable());
    }
}
