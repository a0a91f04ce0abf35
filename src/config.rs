//! Pipeline configuration. Threaded through every call as an immutable value.

use crate::error::ConfigError;
use crate::model::{Algorithm, TimeWindow};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "CME_PREDICT_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding `normalized_{training,testing}_{window}.csv`
    pub data_dir: PathBuf,
    /// Directory holding `{algorithm}-{window}-model.json` artifacts
    pub model_dir: PathBuf,
    /// Where reports are written
    pub output_dir: PathBuf,
    pub sequence: SequenceConfig,
    pub training: TrainingConfig,
    /// Configurations evaluated by the grid runner
    pub grid: GridConfig,
    pub evaluation: EvaluationConfig,
    /// Per-configuration overrides of the built-in feature counts and thresholds
    pub models: Vec<ModelOverride>,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SequenceConfig {
    /// Sentinel written into padded timesteps
    pub mask_value: f32,
    /// Fixed number of timesteps per sample
    pub series_len: usize,
    /// Column offset of the first physical feature
    pub start_feature: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub epochs: usize,
    pub batch_size: usize,
    /// Recurrent hidden units
    pub hidden_size: usize,
    pub learning_rate: f32,
    /// Seed for weight init and shuffling
    pub seed: u64,
    /// Weight classes inversely to their frequency
    pub balance_classes: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub time_windows: Vec<TimeWindow>,
    pub algorithms: Vec<Algorithm>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RocMode {
    /// Sweep thresholds over raw probabilities
    #[default]
    Probabilities,
    /// Sweep over binarized predictions (single operating point)
    Binarized,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub roc_mode: RocMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelOverride {
    pub algorithm: Algorithm,
    pub time_window: TimeWindow,
    pub n_features: usize,
    pub threshold: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            model_dir: PathBuf::from("models"),
            output_dir: PathBuf::from("output"),
            sequence: SequenceConfig::default(),
            training: TrainingConfig::default(),
            grid: GridConfig::default(),
            evaluation: EvaluationConfig::default(),
            models: Vec::new(),
            log: LogConfig::default(),
        }
    }
}

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            mask_value: 0.0,
            series_len: 20,
            start_feature: 4,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            epochs: 20,
            batch_size: 256,
            hidden_size: 10,
            learning_rate: 0.05,
            seed: 42,
            balance_classes: true,
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            time_windows: TimeWindow::ALL.to_vec(),
            algorithms: vec![Algorithm::Lstm, Algorithm::Gru],
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Training or testing half of a time window's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Training,
    Testing,
}

impl Split {
    pub fn as_str(self) -> &'static str {
        match self {
            Split::Training => "training",
            Split::Testing => "testing",
        }
    }

    /// `normalized_{split}_{window}.csv`
    pub fn file_name(self, window: TimeWindow) -> String {
        format!("normalized_{}_{}.csv", self.as_str(), window.hours())
    }
}

impl PipelineConfig {
    /// Load from JSON file if present; otherwise return default.
    /// A file that exists but does not parse is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: PipelineConfig =
            serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sequence.mask_value.is_finite() {
            return Err(ConfigError::Invalid("sequence.mask_value must be finite".into()));
        }
        if self.sequence.series_len == 0 {
            return Err(ConfigError::Invalid("sequence.series_len must be >= 1".into()));
        }
        if self.sequence.start_feature < 4 {
            return Err(ConfigError::Invalid(
                "sequence.start_feature must leave room for label, timestamp, region and HARP columns".into(),
            ));
        }
        if self.training.batch_size == 0 {
            return Err(ConfigError::Invalid("training.batch_size must be >= 1".into()));
        }
        if self.training.hidden_size == 0 {
            return Err(ConfigError::Invalid("training.hidden_size must be >= 1".into()));
        }
        if self.grid.time_windows.is_empty() || self.grid.algorithms.is_empty() {
            return Err(ConfigError::Invalid("grid must name at least one window and algorithm".into()));
        }
        for o in &self.models {
            if !(0.0..=1.0).contains(&o.threshold) {
                return Err(ConfigError::Invalid(format!(
                    "threshold {} for {}-{} outside [0, 1]",
                    o.threshold, o.algorithm, o.time_window
                )));
            }
            if o.n_features == 0 || o.n_features > crate::features::FEATURE_COUNT {
                return Err(ConfigError::Invalid(format!(
                    "n_features {} for {}-{} outside 1..=18",
                    o.n_features, o.algorithm, o.time_window
                )));
            }
        }
        Ok(())
    }

    pub fn data_path(&self, split: Split, window: TimeWindow) -> PathBuf {
        self.data_dir.join(split.file_name(window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_finite_mask_value() {
        for mask_value in [f32::NAN, f32::INFINITY] {
            let mut config = PipelineConfig::default();
            config.sequence.mask_value = mask_value;
            assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        }
    }

    #[test]
    fn data_path_names_split_and_window() {
        let config = PipelineConfig::default();
        assert_eq!(
            config.data_path(Split::Training, TimeWindow::H48),
            PathBuf::from("data/normalized_training_48.csv")
        );
    }
}
