//! Report rendering: JSON summary, ROC points as CSV, text confusion matrices.

use crate::config::RocMode;
use crate::error::{MetricError, PipelineError, PipelineResult};
use crate::evaluation::{ConfigurationMetrics, RocPoint, SkillScores};
use crate::inference::ConfusionMatrix;
use crate::model::{Algorithm, ConfigKey, TimeWindow};
use crate::pipeline::{ConfigurationFailure, GridOutcome};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

pub const REPORT_FILE: &str = "report.json";
pub const ROC_FILE: &str = "roc_points.csv";

#[derive(Debug, Clone, Serialize)]
pub struct ConfigurationEntry {
    pub configuration: String,
    pub algorithm: Algorithm,
    pub window: TimeWindow,
    pub n_features: usize,
    pub threshold: f32,
    pub samples: usize,
    pub positives: usize,
    pub confusion: ConfusionMatrix,
    pub skill: SkillScores,
    /// Absent when the metric is undefined; see `metric_error`
    pub auroc: Option<f64>,
    pub legend: Option<String>,
    pub metric_error: Option<String>,
    pub roc: Vec<RocPoint>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub generated_at: DateTime<Utc>,
    pub roc_mode: RocMode,
    pub configurations: Vec<ConfigurationEntry>,
    pub failures: Vec<ConfigurationFailure>,
}

#[derive(Serialize)]
struct RocRow<'a> {
    configuration: &'a str,
    legend: &'a str,
    fpr: f64,
    tpr: f64,
    threshold: f32,
}

fn report_err(path: &Path, source: std::io::Error) -> PipelineError {
    PipelineError::Report {
        path: path.to_path_buf(),
        source,
    }
}

impl EvaluationReport {
    pub fn from_outcome(
        outcome: &GridOutcome,
        metrics: &BTreeMap<ConfigKey, Result<ConfigurationMetrics, MetricError>>,
    ) -> Self {
        let configurations = outcome
            .aggregator
            .iter()
            .map(|(key, result)| {
                let confusion = result.confusion_matrix();
                let evaluated = metrics
                    .get(key)
                    .cloned()
                    .unwrap_or_else(|| outcome.aggregator.evaluate_one(result));
                let (auroc, legend, metric_error, roc) = match &evaluated {
                    Ok(m) => (Some(m.auroc), Some(m.legend()), None, m.roc.points.clone()),
                    Err(e) => (None, None, Some(e.to_string()), Vec::new()),
                };
                ConfigurationEntry {
                    configuration: key.to_string(),
                    algorithm: key.algorithm,
                    window: key.window,
                    n_features: result.configuration.n_features,
                    threshold: result.configuration.threshold,
                    samples: result.len(),
                    positives: result.truth.iter().filter(|&&t| t == 1).count(),
                    confusion,
                    skill: SkillScores::from_confusion(&confusion),
                    auroc,
                    legend,
                    metric_error,
                    roc,
                }
            })
            .collect();

        Self {
            generated_at: Utc::now(),
            roc_mode: outcome.aggregator.roc_mode(),
            configurations,
            failures: outcome.failures.clone(),
        }
    }

    pub fn write_json(&self, path: &Path) -> PipelineResult<()> {
        let file = File::create(path).map_err(|e| report_err(path, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)
            .map_err(|e| report_err(path, e.into()))?;
        writer.flush().map_err(|e| report_err(path, e))?;
        Ok(())
    }

    /// One row per ROC point: configuration, legend, fpr, tpr, threshold.
    pub fn write_roc_csv(&self, path: &Path) -> PipelineResult<()> {
        let mut writer = csv::Writer::from_path(path).map_err(|e| report_err(path, e.into()))?;
        for entry in &self.configurations {
            let legend = entry.legend.as_deref().unwrap_or("");
            for point in &entry.roc {
                writer
                    .serialize(RocRow {
                        configuration: &entry.configuration,
                        legend,
                        fpr: point.fpr,
                        tpr: point.tpr,
                        threshold: point.threshold,
                    })
                    .map_err(|e| report_err(path, e.into()))?;
            }
        }
        writer.flush().map_err(|e| report_err(path, e))?;
        Ok(())
    }

    /// Confusion matrices titled by legend, followed by any failures.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for entry in &self.configurations {
            let title = match (&entry.legend, &entry.metric_error) {
                (Some(legend), _) => legend.clone(),
                (None, Some(err)) => format!("{} ({err})", entry.configuration),
                (None, None) => entry.configuration.clone(),
            };
            out.push_str(&entry.confusion.render(&title));
            out.push('\n');
        }
        for failure in &self.failures {
            out.push_str(&format!(
                "FAILED {} [{:?}]: {}\n",
                failure.configuration, failure.stage, failure.message
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::EvaluationAggregator;
    use crate::inference::PredictionResult;
    use crate::model::ModelConfiguration;
    use crate::pipeline::FailureStage;

    fn outcome() -> GridOutcome {
        let mut aggregator = EvaluationAggregator::default();
        for (algorithm, truth, probabilities) in [
            (Algorithm::Lstm, vec![0, 1, 0, 1], vec![0.1, 0.9, 0.6, 0.4]),
            (Algorithm::Gru, vec![0, 0, 0, 0], vec![0.1, 0.2, 0.3, 0.4]),
        ] {
            let predicted = probabilities.iter().map(|&p| u8::from(p >= 0.5)).collect();
            aggregator
                .insert(PredictionResult {
                    configuration: ModelConfiguration {
                        algorithm,
                        window: TimeWindow::H12,
                        n_features: 8,
                        threshold: 0.5,
                    },
                    truth,
                    predicted,
                    probabilities,
                })
                .unwrap();
        }
        GridOutcome {
            aggregator,
            failures: vec![ConfigurationFailure {
                configuration: ConfigKey::new(Algorithm::Lstm, TimeWindow::H24),
                stage: FailureStage::Model,
                message: "model artifact not found: models/lstm-24-model.json".into(),
            }],
        }
    }

    #[test]
    fn entries_carry_metrics_or_error() {
        let outcome = outcome();
        let report = EvaluationReport::from_outcome(&outcome, &outcome.aggregator.evaluate());
        assert_eq!(report.configurations.len(), 2);

        let gru = &report.configurations[1];
        assert_eq!(gru.configuration, "gru-12");
        assert_eq!(gru.auroc, None);
        assert!(gru.metric_error.as_deref().unwrap().contains("only class 0"));
        assert_eq!(gru.confusion.total(), 4);

        let lstm = &report.configurations[0];
        assert_eq!(lstm.legend.as_deref(), Some("LSTM 12 Hour (AUROC = 0.750)"));
        assert_eq!(lstm.positives, 2);

        let text = report.render_text();
        assert!(text.contains("LSTM 12 Hour"));
        assert!(text.contains("FAILED lstm-24"));
    }

    #[test]
    fn writes_json_and_roc_csv() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = outcome();
        let report = EvaluationReport::from_outcome(&outcome, &outcome.aggregator.evaluate());

        let json_path = dir.path().join(REPORT_FILE);
        report.write_json(&json_path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
        assert_eq!(value["configurations"].as_array().unwrap().len(), 2);
        assert_eq!(value["failures"][0]["stage"], "model");
        assert_eq!(value["configurations"][0]["confusion"]["fn"], 1);

        let csv_path = dir.path().join(ROC_FILE);
        report.write_roc_csv(&csv_path).unwrap();
        let text = std::fs::read_to_string(&csv_path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("configuration,legend,fpr,tpr,threshold"));
        assert_eq!(lines.count(), 5);
    }
}
