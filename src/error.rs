use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading the model store or the encoder mapping.
///
/// Per-antibiotic load errors never abort startup: the affected antibiotic
/// is left out of the registry and the error is kept in the load report.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The dense-network layer export could not be parsed.
    #[error("invalid layer export in {path}: {message}")]
    LayerExport { path: PathBuf, message: String },

    #[error("missing companion file {path}")]
    MissingCompanion { path: PathBuf },

    #[error("invalid feature columns in {path}: {reason}")]
    FeatureColumns { path: PathBuf, reason: String },

    #[error("invalid label mapping in {path}: {reason}")]
    LabelMapping { path: PathBuf, reason: String },

    #[error("unsupported model in {path}: {reason}")]
    Model { path: PathBuf, reason: String },

    #[error("invalid encoder mapping in {path}: {reason}")]
    EncoderMapping { path: PathBuf, reason: String },

    /// Two artifacts resolve to the same antibiotic identifier.
    #[error("{antibiotic} already loaded from {kept}, ignoring {ignored}")]
    Conflict {
        antibiotic: String,
        kept: PathBuf,
        ignored: PathBuf,
    },
}

/// A prediction failure for a single antibiotic.
///
/// These are rendered into the response as `"Error: {message}"` and do not
/// affect the other antibiotics of the same request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InferenceError {
    #[error("feature shape mismatch, expected: {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("{0}")]
    Predictor(String),
}

/// Errors raised while reading an evaluation dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to parse {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("invalid value '{value}' at row {row} of {path}")]
    InvalidValue {
        path: PathBuf,
        row: usize,
        value: String,
    },

    #[error("{features} feature rows but {labels} labels")]
    LengthMismatch { features: usize, labels: usize },
}
