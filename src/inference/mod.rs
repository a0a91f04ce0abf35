//! Inference and thresholded classification.

mod engine;

pub use engine::{classify, ConfusionMatrix, InferenceEngine, PredictionResult};
