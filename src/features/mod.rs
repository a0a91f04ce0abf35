//! SHARP feature tables and the fixed-length sequences fed to the recurrent models.

mod sequence;
mod table;

pub use sequence::{PaddedSequenceBuilder, SequenceBuilder};
pub use table::{FeatureRecord, FeatureTable, Label};

use crate::model::TimeWindow;
use ndarray::{Array3, ArrayView2};
use serde::{Deserialize, Serialize};

/// Number of physical features per record.
pub const FEATURE_COUNT: usize = 18;

/// Feature columns in file order. The order doubles as the importance ranking:
/// a configuration using N features takes the first N.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "TOTUSJH", "TOTPOT", "TOTUSJZ", "ABSNJZH", "SAVNCPP", "USFLUX", "AREA_ACR", "MEANPOT",
    "R_VALUE", "SHRGT45", "MEANGAM", "MEANJZH", "MEANGBT", "MEANGBZ", "MEANJZD", "MEANGBH",
    "MEANSHR", "MEANALP",
];

/// Batch of mask-padded sequences `[samples, series_len, n_features]` with one
/// binary label per sample (1 = CME-associated flare).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceBatch {
    pub sequences: Array3<f32>,
    pub labels: Vec<u8>,
    pub window: TimeWindow,
}

impl SequenceBatch {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn series_len(&self) -> usize {
        self.sequences.shape()[1]
    }

    pub fn n_features(&self) -> usize {
        self.sequences.shape()[2]
    }

    /// `[series_len, n_features]` view of one sample.
    pub fn sample(&self, index: usize) -> ArrayView2<'_, f32> {
        self.sequences.index_axis(ndarray::Axis(0), index)
    }

    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&l| l == 1).count()
    }
}
