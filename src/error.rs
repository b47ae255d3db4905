//! Library error type.

use std::path::PathBuf;

use crate::label::Num;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the dataset pipeline and evaluation harness.
///
/// Only per-file problems are recoverable (see [`Error::is_recoverable`]);
/// everything else points at a configuration or logic error and aborts the run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown label '{label}'")]
    UnknownLabel { label: String },

    #[error("unknown label code {code}")]
    UnknownCode { code: Num },

    #[error("unknown {kind} '{name}' (available: {})", known.join(", "))]
    UnknownAlgorithm {
        kind: &'static str,
        name: String,
        known: Vec<String>,
    },

    #[error("{}: {reason}", path.display())]
    Format { path: PathBuf, reason: String },

    #[error("cannot {operation} on an empty dataset")]
    EmptyDataset { operation: &'static str },

    #[error("model '{model}' has no training data to predict from")]
    Untrained { model: &'static str },

    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("label '{label}' does not start with '/'")]
    LabelStructure { label: String },

    #[error("{} lies above the requested label depth {depth}", path.display())]
    LabelDepth { path: PathBuf, depth: usize },

    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("numerical failure: {0}")]
    Numeric(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),
}

impl Error {
    /// Whether the error concerns a single input file that a directory scan
    /// may skip.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Format { .. } | Error::LabelDepth { .. } | Error::Csv(_) | Error::Io(_)
        )
    }

    pub(crate) fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Error::Format {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_algorithm_lists_alternatives() {
        let err = Error::UnknownAlgorithm {
            kind: "model",
            name: "svm".into(),
            known: vec!["chance".into(), "correlation".into()],
        };
        assert_eq!(
            err.to_string(),
            "unknown model 'svm' (available: chance, correlation)"
        );
    }

    #[test]
    fn only_file_errors_are_recoverable() {
        assert!(Error::format("a.csv", "bad header").is_recoverable());
        assert!(!Error::UnknownLabel { label: "/x".into() }.is_recoverable());
        assert!(!Error::EmptyDataset { operation: "fit" }.is_recoverable());
    }
}
