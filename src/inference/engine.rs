//! Scores a batch with a frozen model, applies the configuration threshold,
//! and tallies the confusion matrix.

use crate::error::{InferenceError, ModelError};
use crate::features::SequenceBatch;
use crate::model::{ModelConfiguration, SequenceModel};
use serde::{Deserialize, Serialize};

/// 1 iff `probability >= threshold`; the boundary is positive.
pub fn classify(probability: f32, threshold: f32) -> u8 {
    u8::from(probability >= threshold)
}

/// Binary confusion matrix; rows are truth, columns prediction, both ordered
/// [negative, positive].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub tn: usize,
    pub fp: usize,
    #[serde(rename = "fn")]
    pub fn_: usize,
    pub tp: usize,
}

impl ConfusionMatrix {
    pub fn from_labels(truth: &[u8], predicted: &[u8]) -> Self {
        let mut cm = ConfusionMatrix::default();
        for (&t, &p) in truth.iter().zip(predicted) {
            match (t, p) {
                (0, 0) => cm.tn += 1,
                (0, _) => cm.fp += 1,
                (_, 0) => cm.fn_ += 1,
                _ => cm.tp += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.tn + self.fp + self.fn_ + self.tp
    }

    /// `[[tn, fp], [fn, tp]]`
    pub fn rows(&self) -> [[usize; 2]; 2] {
        [[self.tn, self.fp], [self.fn_, self.tp]]
    }

    pub fn render(&self, title: &str) -> String {
        let mut out = format!("{title}\n");
        out.push_str(&format!("{:>10} {:>8} {:>8}\n", "", "pred N", "pred P"));
        out.push_str(&format!("{:>10} {:>8} {:>8}\n", "actual N", self.tn, self.fp));
        out.push_str(&format!("{:>10} {:>8} {:>8}\n", "actual P", self.fn_, self.tp));
        out
    }
}

/// Per-configuration output: truth, binarized predictions and raw probabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub configuration: ModelConfiguration,
    pub truth: Vec<u8>,
    pub predicted: Vec<u8>,
    pub probabilities: Vec<f32>,
}

impl PredictionResult {
    pub fn confusion_matrix(&self) -> ConfusionMatrix {
        ConfusionMatrix::from_labels(&self.truth, &self.predicted)
    }

    pub fn len(&self) -> usize {
        self.truth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.truth.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InferenceEngine;

impl InferenceEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn run(
        &self,
        model: &dyn SequenceModel,
        batch: &SequenceBatch,
        configuration: &ModelConfiguration,
    ) -> Result<PredictionResult, InferenceError> {
        let threshold = configuration.threshold;
        if !(0.0..=1.0).contains(&threshold) {
            return Err(InferenceError::InvalidThreshold(threshold));
        }
        if let Some((index, &value)) = batch.labels.iter().enumerate().find(|(_, l)| **l > 1) {
            return Err(InferenceError::InvalidLabel { index, value });
        }
        if batch.n_features() != configuration.n_features {
            return Err(InferenceError::FeatureCountMismatch {
                expected: configuration.n_features,
                found: batch.n_features(),
            });
        }
        let (expected_len, expected_features) = model.input_shape();
        if batch.series_len() != expected_len || batch.n_features() != expected_features {
            return Err(ModelError::ShapeMismatch {
                expected_len,
                expected_features,
                found_len: batch.series_len(),
                found_features: batch.n_features(),
            }
            .into());
        }

        let scores = model.predict(batch.sequences.view())?;
        if scores.len() != batch.len() {
            return Err(InferenceError::ScoreCount {
                expected: batch.len(),
                found: scores.len(),
            });
        }
        if let Some(index) = scores.iter().position(|s| !s.is_finite()) {
            return Err(InferenceError::NonFiniteScore { index });
        }

        let probabilities: Vec<f32> = scores.into_iter().map(|s| s.clamp(0.0, 1.0)).collect();
        let predicted = probabilities
            .iter()
            .map(|&p| classify(p, threshold))
            .collect();

        Ok(PredictionResult {
            configuration: *configuration,
            truth: batch.labels.clone(),
            predicted,
            probabilities,
        })
    }
}
