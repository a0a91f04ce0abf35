//! Collects per-configuration prediction results and derives their metrics.

use super::roc::RocCurve;
use super::skill::SkillScores;
use crate::config::RocMode;
use crate::error::MetricError;
use crate::inference::{ConfusionMatrix, PredictionResult};
use crate::model::{ConfigKey, ModelConfiguration};
use serde::Serialize;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Plot legend for one configuration, e.g. `LSTM 12 Hour (AUROC = 0.873)`.
pub fn legend(configuration: &ModelConfiguration, auroc: f64) -> String {
    format!(
        "{} {} Hour (AUROC = {:.3})",
        configuration.algorithm.display_name(),
        configuration.window.hours(),
        auroc
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigurationMetrics {
    pub configuration: ModelConfiguration,
    pub samples: usize,
    pub confusion: ConfusionMatrix,
    pub skill: SkillScores,
    pub roc: RocCurve,
    pub auroc: f64,
}

impl ConfigurationMetrics {
    pub fn legend(&self) -> String {
        legend(&self.configuration, self.auroc)
    }
}

/// Truth, predictions and probabilities must line up and hold binary labels.
fn check_result(result: &PredictionResult) -> Result<(), MetricError> {
    let n = result.truth.len();
    for len in [result.predicted.len(), result.probabilities.len()] {
        if len != n {
            return Err(MetricError::LengthMismatch { truth: n, scores: len });
        }
    }
    let bad = result
        .truth
        .iter()
        .chain(&result.predicted)
        .enumerate()
        .find(|(_, l)| **l > 1);
    if let Some((i, &value)) = bad {
        return Err(MetricError::InvalidLabel { index: i % n, value });
    }
    Ok(())
}

#[derive(Debug, Default)]
pub struct EvaluationAggregator {
    roc_mode: RocMode,
    results: BTreeMap<ConfigKey, PredictionResult>,
}

impl EvaluationAggregator {
    pub fn new(roc_mode: RocMode) -> Self {
        Self {
            roc_mode,
            results: BTreeMap::new(),
        }
    }

    pub fn roc_mode(&self) -> RocMode {
        self.roc_mode
    }

    /// Each configuration is written once; a repeat insert is rejected and
    /// leaves the stored result untouched. Inconsistent results are rejected.
    pub fn insert(&mut self, result: PredictionResult) -> Result<(), MetricError> {
        check_result(&result)?;
        match self.results.entry(result.configuration.key()) {
            Entry::Occupied(e) => Err(MetricError::DuplicateConfiguration(e.key().to_string())),
            Entry::Vacant(e) => {
                e.insert(result);
                Ok(())
            }
        }
    }

    pub fn get(&self, key: &ConfigKey) -> Option<&PredictionResult> {
        self.results.get(key)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ConfigKey, &PredictionResult)> {
        self.results.iter()
    }

    pub fn evaluate_one(&self, result: &PredictionResult) -> Result<ConfigurationMetrics, MetricError> {
        check_result(result)?;
        if result.is_empty() {
            return Err(MetricError::EmptyResult);
        }
        let binarized: Vec<f32>;
        let scores = match self.roc_mode {
            RocMode::Probabilities => result.probabilities.as_slice(),
            RocMode::Binarized => {
                binarized = result.predicted.iter().map(|&p| f32::from(p)).collect();
                binarized.as_slice()
            }
        };
        let roc = RocCurve::from_scores(&result.truth, scores)?;
        let confusion = result.confusion_matrix();
        Ok(ConfigurationMetrics {
            configuration: result.configuration,
            samples: result.len(),
            confusion,
            skill: SkillScores::from_confusion(&confusion),
            auroc: roc.auc(),
            roc,
        })
    }

    pub fn evaluate(&self) -> BTreeMap<ConfigKey, Result<ConfigurationMetrics, MetricError>> {
        self.results
            .iter()
            .map(|(key, result)| (*key, self.evaluate_one(result)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Algorithm, TimeWindow};

    fn result(
        algorithm: Algorithm,
        window: TimeWindow,
        truth: Vec<u8>,
        probabilities: Vec<f32>,
    ) -> PredictionResult {
        let threshold = 0.5;
        let predicted = probabilities.iter().map(|&p| u8::from(p >= threshold)).collect();
        PredictionResult {
            configuration: ModelConfiguration {
                algorithm,
                window,
                n_features: 4,
                threshold,
            },
            truth,
            predicted,
            probabilities,
        }
    }

    #[test]
    fn perfect_separation_scores_one() {
        let mut agg = EvaluationAggregator::default();
        agg.insert(result(Algorithm::Lstm, TimeWindow::H12, vec![0, 0, 1, 1], vec![0.1, 0.2, 0.8, 0.9]))
            .unwrap();
        let metrics = agg.evaluate();
        let m = metrics[&ConfigKey::new(Algorithm::Lstm, TimeWindow::H12)].as_ref().unwrap();
        assert!((m.auroc - 1.0).abs() < 1e-12);
        assert_eq!(m.legend(), "LSTM 12 Hour (AUROC = 1.000)");
    }

    #[test]
    fn all_negative_is_undefined_not_half() {
        let mut agg = EvaluationAggregator::default();
        agg.insert(result(Algorithm::Gru, TimeWindow::H24, vec![0; 4], vec![0.1, 0.2, 0.3, 0.4]))
            .unwrap();
        let metrics = agg.evaluate();
        assert_eq!(
            metrics[&ConfigKey::new(Algorithm::Gru, TimeWindow::H24)],
            Err(MetricError::UndefinedAuroc { class: 0 })
        );
    }

    #[test]
    fn empty_result_flagged() {
        let mut agg = EvaluationAggregator::default();
        agg.insert(result(Algorithm::Gru, TimeWindow::H60, vec![], vec![])).unwrap();
        let metrics = agg.evaluate();
        assert_eq!(
            metrics[&ConfigKey::new(Algorithm::Gru, TimeWindow::H60)],
            Err(MetricError::EmptyResult)
        );
    }

    #[test]
    fn duplicate_insert_rejected_without_overwrite() {
        let mut agg = EvaluationAggregator::default();
        agg.insert(result(Algorithm::Lstm, TimeWindow::H36, vec![0, 1], vec![0.2, 0.7]))
            .unwrap();
        let err = agg
            .insert(result(Algorithm::Lstm, TimeWindow::H36, vec![1, 0], vec![0.2, 0.7]))
            .unwrap_err();
        assert_eq!(err, MetricError::DuplicateConfiguration("lstm-36".to_string()));
        assert_eq!(agg.len(), 1);
        let stored = agg.get(&ConfigKey::new(Algorithm::Lstm, TimeWindow::H36)).unwrap();
        assert_eq!(stored.truth, vec![0, 1]);
    }

    #[test]
    fn rejects_misaligned_or_non_binary_results() {
        let mut agg = EvaluationAggregator::default();

        let mut short = result(Algorithm::Lstm, TimeWindow::H12, vec![0, 1, 0, 1], vec![0.1, 0.9, 0.6, 0.4]);
        short.predicted.truncate(2);
        assert_eq!(
            agg.insert(short),
            Err(MetricError::LengthMismatch { truth: 4, scores: 2 })
        );

        let three_labels = result(Algorithm::Gru, TimeWindow::H12, vec![0, 1, 0, 2], vec![0.1, 0.9, 0.6, 0.4]);
        assert_eq!(
            agg.insert(three_labels),
            Err(MetricError::InvalidLabel { index: 3, value: 2 })
        );

        let mut bad_prediction = result(Algorithm::Gru, TimeWindow::H24, vec![0, 1], vec![0.1, 0.9]);
        bad_prediction.predicted[0] = 7;
        assert_eq!(
            agg.evaluate_one(&bad_prediction),
            Err(MetricError::InvalidLabel { index: 0, value: 7 })
        );
        assert!(agg.is_empty());
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let a = result(Algorithm::Lstm, TimeWindow::H12, vec![0, 1, 0, 1], vec![0.1, 0.9, 0.6, 0.4]);
        let b = result(Algorithm::Gru, TimeWindow::H48, vec![1, 0, 0, 1], vec![0.7, 0.3, 0.5, 0.5]);

        let mut forward = EvaluationAggregator::default();
        forward.insert(a.clone()).unwrap();
        forward.insert(b.clone()).unwrap();
        let mut reverse = EvaluationAggregator::default();
        reverse.insert(b).unwrap();
        reverse.insert(a).unwrap();

        assert_eq!(forward.evaluate(), reverse.evaluate());
    }

    #[test]
    fn binarized_mode_uses_single_operating_point() {
        let mut agg = EvaluationAggregator::new(RocMode::Binarized);
        agg.insert(result(Algorithm::Lstm, TimeWindow::H12, vec![0, 1, 0, 1], vec![0.1, 0.9, 0.6, 0.4]))
            .unwrap();
        let metrics = agg.evaluate();
        let m = metrics[&ConfigKey::new(Algorithm::Lstm, TimeWindow::H12)].as_ref().unwrap();
        assert_eq!(m.roc.points.len(), 3);
        assert_eq!((m.roc.points[1].fpr, m.roc.points[1].tpr), (0.5, 0.5));
        assert!((m.auroc - 0.5).abs() < 1e-12);
        assert_eq!(m.confusion, ConfusionMatrix { tn: 1, fp: 1, fn_: 1, tp: 1 });
    }
}
