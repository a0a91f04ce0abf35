//! Threshold-dependent skill scores derived from a confusion matrix.

use crate::inference::ConfusionMatrix;
use serde::{Deserialize, Serialize};

fn ratio(num: f64, denom: f64) -> Option<f64> {
    (denom != 0.0).then(|| num / denom)
}

/// `None` marks a score whose denominator is zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkillScores {
    pub accuracy: Option<f64>,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    /// True skill statistic: recall - false alarm rate
    pub tss: Option<f64>,
    /// Heidke skill score
    pub hss: Option<f64>,
}

impl SkillScores {
    pub fn from_confusion(cm: &ConfusionMatrix) -> Self {
        let (tn, fp, fn_, tp) = (cm.tn as f64, cm.fp as f64, cm.fn_ as f64, cm.tp as f64);
        let recall = ratio(tp, tp + fn_);
        let false_alarm = ratio(fp, fp + tn);
        Self {
            accuracy: ratio(tp + tn, tp + tn + fp + fn_),
            precision: ratio(tp, tp + fp),
            recall,
            tss: recall.zip(false_alarm).map(|(r, f)| r - f),
            hss: ratio(
                2.0 * (tp * tn - fn_ * fp),
                (tp + fn_) * (fn_ + tn) + (tp + fp) * (fp + tn),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balanced_errors() {
        let s = SkillScores::from_confusion(&ConfusionMatrix { tn: 1, fp: 1, fn_: 1, tp: 1 });
        assert_eq!(s.accuracy, Some(0.5));
        assert_eq!(s.precision, Some(0.5));
        assert_eq!(s.recall, Some(0.5));
        assert_eq!(s.tss, Some(0.0));
        assert_eq!(s.hss, Some(0.0));
    }

    #[test]
    fn perfect_forecast() {
        let s = SkillScores::from_confusion(&ConfusionMatrix { tn: 5, fp: 0, fn_: 0, tp: 3 });
        assert_eq!(s.tss, Some(1.0));
        assert_eq!(s.hss, Some(1.0));
    }

    #[test]
    fn undefined_when_no_positives() {
        let s = SkillScores::from_confusion(&ConfusionMatrix { tn: 4, fp: 0, fn_: 0, tp: 0 });
        assert_eq!(s.recall, None);
        assert_eq!(s.precision, None);
        assert_eq!(s.tss, None);
        assert_eq!(s.accuracy, Some(1.0));
    }
}
