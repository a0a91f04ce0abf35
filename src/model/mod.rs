//! Recurrent CME classifiers (LSTM, GRU), their per-configuration settings,
//! and the provider that loads or builds them.

mod provider;
mod registry;
mod rnn;

pub use provider::{FileModelProvider, ModelProvider};
pub use registry::ModelRegistry;
pub use rnn::{
    Dense, GruCell, LstmCell, RecurrentCell, RecurrentModel, SequenceClassifier, TrainingSummary,
};

use crate::error::{ConfigError, ModelError};
use ndarray::ArrayView3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    Lstm,
    Gru,
}

impl Algorithm {
    pub const ALL: [Algorithm; 2] = [Algorithm::Lstm, Algorithm::Gru];

    /// Upper-case name used in report legends.
    pub fn display_name(self) -> &'static str {
        match self {
            Algorithm::Lstm => "LSTM",
            Algorithm::Gru => "GRU",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Algorithm::Lstm => "lstm",
            Algorithm::Gru => "gru",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lstm" => Ok(Algorithm::Lstm),
            "gru" => Ok(Algorithm::Gru),
            _ => Err(ConfigError::UnknownAlgorithm(s.to_string())),
        }
    }
}

/// Hours between the initial flare and the forecast target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum TimeWindow {
    H12,
    H24,
    H36,
    H48,
    H60,
}

impl TimeWindow {
    pub const ALL: [TimeWindow; 5] = [
        TimeWindow::H12,
        TimeWindow::H24,
        TimeWindow::H36,
        TimeWindow::H48,
        TimeWindow::H60,
    ];

    pub fn hours(self) -> u32 {
        match self {
            TimeWindow::H12 => 12,
            TimeWindow::H24 => 24,
            TimeWindow::H36 => 36,
            TimeWindow::H48 => 48,
            TimeWindow::H60 => 60,
        }
    }
}

impl TryFrom<u32> for TimeWindow {
    type Error = ConfigError;

    fn try_from(hours: u32) -> Result<Self, Self::Error> {
        TimeWindow::ALL
            .into_iter()
            .find(|w| w.hours() == hours)
            .ok_or(ConfigError::UnsupportedWindow(hours))
    }
}

impl From<TimeWindow> for u32 {
    fn from(w: TimeWindow) -> u32 {
        w.hours()
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hours())
    }
}

impl FromStr for TimeWindow {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hours: u32 = s
            .trim()
            .trim_end_matches(|c: char| c == 'h' || c == 'H')
            .parse()
            .map_err(|_| ConfigError::Invalid(format!("time window {s:?} is not a number of hours")))?;
        TimeWindow::try_from(hours)
    }
}

/// Identity of one grid cell, e.g. `lstm-12`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConfigKey {
    pub algorithm: Algorithm,
    pub window: TimeWindow,
}

impl ConfigKey {
    pub fn new(algorithm: Algorithm, window: TimeWindow) -> Self {
        Self { algorithm, window }
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.algorithm, self.window)
    }
}

/// Looked-up settings for one (algorithm, window) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelConfiguration {
    pub algorithm: Algorithm,
    pub window: TimeWindow,
    /// Top-ranked features kept (<= 18)
    pub n_features: usize,
    /// Probability cut-point; `p >= threshold` is positive
    pub threshold: f32,
}

impl ModelConfiguration {
    pub fn key(&self) -> ConfigKey {
        ConfigKey::new(self.algorithm, self.window)
    }

    pub fn label(&self) -> String {
        self.key().to_string()
    }
}

/// A frozen model that scores `[samples, series_len, n_features]` batches.
pub trait SequenceModel {
    fn algorithm(&self) -> Algorithm;

    /// `(series_len, n_features)` the model was built for.
    fn input_shape(&self) -> (usize, usize);

    /// One probability per sample, in sample order.
    fn predict(&self, sequences: ArrayView3<'_, f32>) -> Result<Vec<f32>, ModelError>;
}
