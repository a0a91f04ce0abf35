//! Model provider: configuration lookup plus load/build/save of persisted models.
//! A missing artifact is an error for that configuration only.

use super::{
    Algorithm, ConfigKey, ModelConfiguration, ModelRegistry, RecurrentModel, SequenceModel,
    TimeWindow,
};
use crate::config::{PipelineConfig, SequenceConfig, TrainingConfig};
use crate::error::ModelError;
use std::path::{Path, PathBuf};

pub trait ModelProvider {
    fn configuration(&self, algorithm: Algorithm, window: TimeWindow) -> ModelConfiguration;

    fn load(&self, configuration: &ModelConfiguration) -> Result<Box<dyn SequenceModel>, ModelError>;
}

/// Models stored as `{model_dir}/{algorithm}-{window}-model.json`.
pub struct FileModelProvider {
    model_dir: PathBuf,
    registry: ModelRegistry,
    sequence: SequenceConfig,
    training: TrainingConfig,
}

impl FileModelProvider {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            model_dir: config.model_dir.clone(),
            registry: ModelRegistry::with_overrides(&config.models),
            sequence: config.sequence,
            training: config.training.clone(),
        }
    }

    pub fn artifact_path(&self, key: ConfigKey) -> PathBuf {
        self.model_dir.join(format!("{key}-model.json"))
    }

    /// `(n_features, threshold)` for one configuration.
    pub fn get_config(&self, algorithm: Algorithm, window: TimeWindow) -> (usize, f32) {
        self.registry.get(algorithm, window)
    }

    pub fn load_path(&self, path: &Path) -> Result<RecurrentModel, ModelError> {
        RecurrentModel::load(path)
    }

    /// Untrained model seeded from the training config.
    pub fn build(&self, algorithm: Algorithm, n_features: usize, series_len: usize) -> RecurrentModel {
        RecurrentModel::build(
            algorithm,
            n_features,
            series_len,
            self.sequence.mask_value,
            &self.training,
        )
    }

    pub fn save(
        &self,
        model: &RecurrentModel,
        configuration: &ModelConfiguration,
    ) -> Result<PathBuf, ModelError> {
        std::fs::create_dir_all(&self.model_dir).map_err(|source| ModelError::Io {
            path: self.model_dir.clone(),
            source,
        })?;
        let path = self.artifact_path(configuration.key());
        model.save(&path)?;
        tracing::info!(configuration = %configuration.key(), path = %path.display(), "model saved");
        Ok(path)
    }
}

impl ModelProvider for FileModelProvider {
    fn configuration(&self, algorithm: Algorithm, window: TimeWindow) -> ModelConfiguration {
        self.registry.configuration(algorithm, window)
    }

    fn load(&self, configuration: &ModelConfiguration) -> Result<Box<dyn SequenceModel>, ModelError> {
        let path = self.artifact_path(configuration.key());
        let model = self.load_path(&path)?;
        if model.algorithm() != configuration.algorithm {
            return Err(ModelError::AlgorithmMismatch {
                path,
                expected: configuration.algorithm,
                found: model.algorithm(),
            });
        }
        tracing::debug!(configuration = %configuration.key(), path = %path.display(), "model loaded");
        Ok(Box::new(model))
    }
}
