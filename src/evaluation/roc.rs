//! ROC construction and trapezoidal AUROC.

use crate::error::MetricError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RocPoint {
    pub fpr: f64,
    pub tpr: f64,
    /// Scores `>= threshold` count as positive at this point; +inf at the origin
    pub threshold: f32,
}

/// Points ordered from (0, 0) to (1, 1).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RocCurve {
    pub points: Vec<RocPoint>,
}

impl RocCurve {
    /// Sweeps the threshold over every distinct score, highest first. Tied
    /// scores move the curve in a single (diagonal) step.
    pub fn from_scores(truth: &[u8], scores: &[f32]) -> Result<Self, MetricError> {
        if truth.len() != scores.len() {
            return Err(MetricError::LengthMismatch {
                truth: truth.len(),
                scores: scores.len(),
            });
        }
        if truth.is_empty() {
            return Err(MetricError::EmptyResult);
        }
        let positives = truth.iter().filter(|&&t| t == 1).count();
        let negatives = truth.len() - positives;
        if positives == 0 {
            return Err(MetricError::UndefinedAuroc { class: 0 });
        }
        if negatives == 0 {
            return Err(MetricError::UndefinedAuroc { class: 1 });
        }

        let mut order: Vec<usize> = (0..scores.len()).collect();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]));

        let mut points = vec![RocPoint {
            fpr: 0.0,
            tpr: 0.0,
            threshold: f32::INFINITY,
        }];
        let (mut tp, mut fp) = (0usize, 0usize);
        let mut i = 0;
        while i < order.len() {
            let score = scores[order[i]];
            while i < order.len() && scores[order[i]] == score {
                if truth[order[i]] == 1 {
                    tp += 1;
                } else {
                    fp += 1;
                }
                i += 1;
            }
            points.push(RocPoint {
                fpr: fp as f64 / negatives as f64,
                tpr: tp as f64 / positives as f64,
                threshold: score,
            });
        }
        Ok(Self { points })
    }

    /// Trapezoidal area under the curve.
    pub fn auc(&self) -> f64 {
        self.points
            .windows(2)
            .map(|w| (w[1].fpr - w[0].fpr) * (w[0].tpr + w[1].tpr) / 2.0)
            .sum()
    }
}
