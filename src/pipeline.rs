//! Grid runner and trainer: walks the (time window, algorithm) grid, scoring or
//! fitting one configuration at a time. A failing configuration is recorded
//! and the loop moves on.

use crate::config::{PipelineConfig, Split};
use crate::error::{DataError, PipelineError, PipelineResult};
use crate::evaluation::EvaluationAggregator;
use crate::features::{FeatureTable, SequenceBuilder};
use crate::inference::{InferenceEngine, PredictionResult};
use crate::model::{
    Algorithm, ConfigKey, FileModelProvider, ModelConfiguration, ModelProvider, TimeWindow,
    TrainingSummary,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, info_span, warn};

/// Where the feature tables come from.
pub trait TableSource {
    fn load(&self, split: Split, window: TimeWindow) -> Result<FeatureTable, DataError>;
}

/// Reads `{data_dir}/normalized_{split}_{window}.csv`.
pub struct CsvTableSource {
    data_dir: PathBuf,
    start_feature: usize,
}

impl CsvTableSource {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            data_dir: config.data_dir.clone(),
            start_feature: config.sequence.start_feature,
        }
    }

    pub fn path(&self, split: Split, window: TimeWindow) -> PathBuf {
        self.data_dir.join(split.file_name(window))
    }
}

impl TableSource for CsvTableSource {
    fn load(&self, split: Split, window: TimeWindow) -> Result<FeatureTable, DataError> {
        FeatureTable::from_path(&self.path(split, window), self.start_feature)
    }
}

/// Layer that failed a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureStage {
    Config,
    Data,
    Model,
    Inference,
    Metric,
    Report,
}

impl FailureStage {
    pub fn of(error: &PipelineError) -> Self {
        match error {
            PipelineError::Config(_) => FailureStage::Config,
            PipelineError::Data(_) => FailureStage::Data,
            PipelineError::Model(_) => FailureStage::Model,
            PipelineError::Inference(_) => FailureStage::Inference,
            PipelineError::Metric(_) => FailureStage::Metric,
            PipelineError::Report { .. } => FailureStage::Report,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConfigurationFailure {
    pub configuration: ConfigKey,
    pub stage: FailureStage,
    pub message: String,
}

impl ConfigurationFailure {
    fn new(configuration: ConfigKey, error: &PipelineError) -> Self {
        Self {
            configuration,
            stage: FailureStage::of(error),
            message: error.to_string(),
        }
    }
}

/// Successful results plus the configurations that could not be scored.
#[derive(Debug)]
pub struct GridOutcome {
    pub aggregator: EvaluationAggregator,
    pub failures: Vec<ConfigurationFailure>,
}

impl GridOutcome {
    /// Nothing succeeded and at least one configuration was attempted.
    pub fn all_failed(&self) -> bool {
        self.aggregator.is_empty() && !self.failures.is_empty()
    }
}

pub struct GridRunner<'a> {
    config: &'a PipelineConfig,
    source: &'a dyn TableSource,
    provider: &'a dyn ModelProvider,
    builder: &'a dyn SequenceBuilder,
    engine: InferenceEngine,
}

impl<'a> GridRunner<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        source: &'a dyn TableSource,
        provider: &'a dyn ModelProvider,
        builder: &'a dyn SequenceBuilder,
    ) -> Self {
        Self {
            config,
            source,
            provider,
            builder,
            engine: InferenceEngine::new(),
        }
    }

    /// Scores every configuration in the grid. The testing table is loaded once
    /// per window; at most one model is alive at a time.
    pub fn run(&self) -> GridOutcome {
        let mut aggregator = EvaluationAggregator::new(self.config.evaluation.roc_mode);
        let mut failures = Vec::new();

        for &window in &self.config.grid.time_windows {
            let table = match self.source.load(Split::Testing, window) {
                Ok(table) => table,
                Err(e) => {
                    let error = PipelineError::from(e);
                    for &algorithm in &self.config.grid.algorithms {
                        let key = ConfigKey::new(algorithm, window);
                        warn!(configuration = %key, error = %error, "testing table unavailable");
                        failures.push(ConfigurationFailure::new(key, &error));
                    }
                    continue;
                }
            };

            for &algorithm in &self.config.grid.algorithms {
                let configuration = self.provider.configuration(algorithm, window);
                let key = configuration.key();
                let span = info_span!("configuration", configuration = %key);
                let _enter = span.enter();

                let outcome = self
                    .score(&table, &configuration)
                    .and_then(|result| aggregator.insert(result).map_err(PipelineError::from));
                if let Err(error) = outcome {
                    warn!(configuration = %key, error = %error, "configuration failed");
                    failures.push(ConfigurationFailure::new(key, &error));
                }
            }
        }

        info!(
            scored = aggregator.len(),
            failed = failures.len(),
            "grid complete"
        );
        GridOutcome {
            aggregator,
            failures,
        }
    }

    /// Loads one model, scores the window's testing batch, drops the model.
    pub fn score(
        &self,
        table: &FeatureTable,
        configuration: &ModelConfiguration,
    ) -> PipelineResult<PredictionResult> {
        let model = self.provider.load(configuration)?;
        let batch = self
            .builder
            .build(table, configuration.n_features, configuration.window)?;
        let result = self.engine.run(model.as_ref(), &batch, configuration)?;
        info!(
            samples = result.len(),
            positives = batch.positives(),
            threshold = configuration.threshold,
            "configuration scored"
        );
        Ok(result)
    }
}

/// Builds, fits and saves the model for one configuration from its training table.
pub fn train_configuration(
    config: &PipelineConfig,
    provider: &FileModelProvider,
    builder: &dyn SequenceBuilder,
    source: &dyn TableSource,
    algorithm: Algorithm,
    window: TimeWindow,
) -> PipelineResult<(PathBuf, TrainingSummary)> {
    let configuration = provider.configuration(algorithm, window);
    let span = info_span!("train", configuration = %configuration.key());
    let _enter = span.enter();

    let table = source.load(Split::Training, window)?;
    let batch = builder.build(&table, configuration.n_features, window)?;
    info!(
        samples = batch.len(),
        positives = batch.positives(),
        n_features = configuration.n_features,
        "training batch built"
    );

    let mut model = provider.build(algorithm, configuration.n_features, config.sequence.series_len);
    let summary = model.fit(&batch, &config.training)?;
    let path = provider.save(&model, &configuration)?;
    info!(
        epochs = summary.losses.len(),
        final_loss = summary.final_loss().unwrap_or(f32::NAN),
        path = %path.display(),
        "training complete"
    );
    Ok((path, summary))
}

/// Creates `dir` (and parents) for report output.
pub fn ensure_dir(dir: &Path) -> PipelineResult<()> {
    std::fs::create_dir_all(dir).map_err(|source| PipelineError::Report {
        path: dir.to_path_buf(),
        source,
    })
}
