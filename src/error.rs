//! Error taxonomy: data format, model artifacts and shapes, degenerate metrics.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("unsupported time window {0} h (expected one of 12, 24, 36, 48, 60)")]
    UnsupportedWindow(u32),

    #[error("unknown algorithm {0:?} (expected lstm or gru)")]
    UnknownAlgorithm(String),
}

#[derive(Error, Debug)]
pub enum DataError {
    #[error("failed to open feature table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("line {line}: expected {expected} fields, found {found}")]
    RowLength {
        line: u64,
        expected: usize,
        found: usize,
    },

    #[error("line {line}: unknown label {value:?}")]
    BadLabel { line: u64, value: String },

    #[error("line {line}: column {column} is not a number: {value:?}")]
    BadNumber {
        line: u64,
        column: &'static str,
        value: String,
    },

    #[error("line {line}: unparseable timestamp {value:?}")]
    BadTimestamp { line: u64, value: String },

    #[error("feature count {0} out of range 1..=18")]
    InvalidFeatureCount(usize),

    #[error("series length must be at least 1")]
    InvalidSeriesLength,

    #[error("sequence tensor shape: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("model artifact not found: {path}")]
    MissingArtifact { path: PathBuf },

    #[error("model I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("model serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("shape mismatch: model expects (series_len={expected_len}, n_features={expected_features}), batch has (series_len={found_len}, n_features={found_features})")]
    ShapeMismatch {
        expected_len: usize,
        expected_features: usize,
        found_len: usize,
        found_features: usize,
    },

    #[error("{path} holds a {found} model, expected {expected}")]
    AlgorithmMismatch {
        path: PathBuf,
        expected: crate::model::Algorithm,
        found: crate::model::Algorithm,
    },

    #[error("cannot fit on an empty batch")]
    EmptyTrainingSet,

    #[error("training diverged at epoch {epoch}")]
    Diverged { epoch: usize },
}

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("threshold {0} outside [0, 1]")]
    InvalidThreshold(f32),

    #[error("ground-truth label {value} at sample {index} is not 0 or 1")]
    InvalidLabel { index: usize, value: u8 },

    #[error("configuration expects {expected} features, batch has {found}")]
    FeatureCountMismatch { expected: usize, found: usize },

    #[error("model returned {found} scores for {expected} samples")]
    ScoreCount { expected: usize, found: usize },

    #[error("model returned a non-finite score at sample {index}")]
    NonFiniteScore { index: usize },

    #[error(transparent)]
    Model(#[from] ModelError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricError {
    #[error("no samples to evaluate")]
    EmptyResult,

    #[error("AUROC undefined: ground truth contains only class {class}")]
    UndefinedAuroc { class: u8 },

    #[error("truth and scores differ in length ({truth} vs {scores})")]
    LengthMismatch { truth: usize, scores: usize },

    #[error("label {value} at sample {index} is not 0 or 1")]
    InvalidLabel { index: usize, value: u8 },

    #[error("configuration {0} already has a result")]
    DuplicateConfiguration(String),
}

/// Anything that can fail one grid configuration.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error(transparent)]
    Metric(#[from] MetricError),

    #[error("report I/O error on {path}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type PipelineResult<T> = Result<T, PipelineError>;
