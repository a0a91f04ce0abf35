//! Windowing: flat feature table → fixed-length, mask-padded sequences per HARP region.

use super::{FeatureRecord, FeatureTable, SequenceBatch, FEATURE_COUNT};
use crate::config::SequenceConfig;
use crate::error::DataError;
use crate::model::TimeWindow;
use ndarray::Array3;

/// Turns a feature table into a model-ready batch.
pub trait SequenceBuilder {
    fn build(
        &self,
        table: &FeatureTable,
        n_features: usize,
        window: TimeWindow,
    ) -> Result<SequenceBatch, DataError>;
}

/// One sample per labelled record: the record plus up to `series_len - 1`
/// directly preceding records of the same HARP region, newest last,
/// left-padded with `mask_value` rows.
#[derive(Debug, Clone, Copy)]
pub struct PaddedSequenceBuilder {
    pub series_len: usize,
    pub mask_value: f32,
}

impl PaddedSequenceBuilder {
    pub fn new(config: &SequenceConfig) -> Self {
        Self {
            series_len: config.series_len,
            mask_value: config.mask_value,
        }
    }
}

// Zero (or non-finite) in any selected feature marks a missing measurement.
fn is_complete(record: &FeatureRecord, n_features: usize) -> bool {
    record.top(n_features).iter().all(|v| v.is_finite() && *v != 0.0)
}

impl SequenceBuilder for PaddedSequenceBuilder {
    fn build(
        &self,
        table: &FeatureTable,
        n_features: usize,
        window: TimeWindow,
    ) -> Result<SequenceBatch, DataError> {
        if n_features == 0 || n_features > FEATURE_COUNT {
            return Err(DataError::InvalidFeatureCount(n_features));
        }
        if self.series_len == 0 {
            return Err(DataError::InvalidSeriesLength);
        }

        let mask_row = vec![self.mask_value; n_features];
        let mut data: Vec<f32> = Vec::new();
        let mut labels: Vec<u8> = Vec::new();
        let mut skipped = 0usize;

        for (k, record) in table.records.iter().enumerate() {
            let Some(target) = record.label.target() else {
                continue;
            };
            if !is_complete(record, n_features) {
                skipped += 1;
                continue;
            }

            // newest first while walking back
            let mut history: Vec<Option<&[f32]>> = vec![Some(record.top(n_features))];
            let mut idx = k;
            while idx > 0 && history.len() < self.series_len {
                idx -= 1;
                let prev = &table.records[idx];
                if prev.harp != record.harp {
                    break;
                }
                history.push(is_complete(prev, n_features).then(|| prev.top(n_features)));
            }

            for _ in history.len()..self.series_len {
                data.extend_from_slice(&mask_row);
            }
            for row in history.iter().rev() {
                data.extend_from_slice(row.unwrap_or(mask_row.as_slice()));
            }
            labels.push(target);
        }

        if skipped > 0 {
            tracing::debug!(skipped, window = window.hours(), "records with missing features dropped");
        }

        let sequences = Array3::from_shape_vec((labels.len(), self.series_len, n_features), data)?;
        Ok(SequenceBatch {
            sequences,
            labels,
            window,
        })
    }
}
