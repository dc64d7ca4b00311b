//! Error types for the rnalytics library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum RnaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid count value '{value}' for gene '{gene}', sample '{sample}'")]
    InvalidCount {
        value: String,
        gene: String,
        sample: String,
    },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Duplicate {kind} identifier '{id}'")]
    DuplicateId { kind: &'static str, id: String },

    #[error("Sample ID mismatch: {0}")]
    SampleMismatch(String),

    #[error("Missing column '{0}' in metadata")]
    MissingColumn(String),

    #[error("Missing value in column '{column}' for sample '{sample}'")]
    MissingValue { column: String, sample: String },

    #[error("Unknown treatment '{treatment}', must be one of {valid:?}")]
    UnknownTreatment {
        treatment: String,
        valid: Vec<String>,
    },

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Numerical error: {0}")]
    Numerical(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Plot error: {0}")]
    Plot(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, RnaError>;
