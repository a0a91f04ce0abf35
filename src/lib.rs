//! CME Predict: scores SHARP flare feature sequences with recurrent
//! classifiers across a grid of (algorithm, time window) configurations.
//!
//! Modular structure:
//! - [`features`]: Feature table loading and windowed sequence building
//! - [`model`]: LSTM/GRU classifiers, per-configuration registry, model provider
//! - [`inference`]: Thresholded classification and confusion matrices
//! - [`evaluation`]: ROC, AUROC and skill scores per configuration
//! - [`pipeline`]: Grid runner and trainer
//! - [`report`]: JSON, CSV and text output
//! - [`logging`]: Structured logging

pub mod config;
pub mod error;
pub mod evaluation;
pub mod features;
pub mod inference;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod report;

pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use evaluation::{ConfigurationMetrics, EvaluationAggregator};
pub use features::{FeatureTable, PaddedSequenceBuilder, SequenceBatch, SequenceBuilder};
pub use inference::{ConfusionMatrix, InferenceEngine, PredictionResult};
pub use logging::StructuredLogger;
pub use model::{Algorithm, FileModelProvider, ModelProvider, TimeWindow};
pub use pipeline::{train_configuration, CsvTableSource, GridOutcome, GridRunner};
pub use report::EvaluationReport;
