//! Error types for the poisson-cat library.

use std::fmt;
use thiserror::Error;

/// Which side of the two-level requirement a covariate violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    TooFew,
    TooMany,
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cardinality::TooFew => write!(f, "fewer"),
            Cardinality::TooMany => write!(f, "more"),
        }
    }
}

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum DaaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid count value '{value}' at row {row}, column {col}")]
    InvalidCount {
        value: String,
        row: usize,
        col: usize,
    },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("sample identifiers inconsistent between metadata and matrix: {0}")]
    SampleMismatch(String),

    #[error("covariate has {kind} than two categories (found {found}); only binary covariates are supported")]
    CategoryCardinality { kind: Cardinality, found: usize },

    #[error("Missing column '{0}' in metadata")]
    MissingColumn(String),

    #[error("Reference category '{reference}' not found in column '{column}'")]
    UnknownReference { column: String, reference: String },

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, DaaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cardinality_messages() {
        let few = DaaError::CategoryCardinality {
            kind: Cardinality::TooFew,
            found: 1,
        };
        assert!(few
            .to_string()
            .contains("covariate has fewer than two categories"));

        let many = DaaError::CategoryCardinality {
            kind: Cardinality::TooMany,
            found: 3,
        };
        assert!(many
            .to_string()
            .contains("covariate has more than two categories"));
    }

    #[test]
    fn test_sample_mismatch_message() {
        let err = DaaError::SampleMismatch("sample 'S9' missing".into());
        assert!(err
            .to_string()
            .starts_with("sample identifiers inconsistent between metadata and matrix"));
    }
}
