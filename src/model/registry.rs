//! Per-configuration feature counts and decision thresholds.

use super::{Algorithm, ConfigKey, ModelConfiguration, TimeWindow};
use crate::config::ModelOverride;
use std::collections::BTreeMap;

/// Tuned `(n_features, threshold)` for the published models.
fn tuned(algorithm: Algorithm, window: TimeWindow) -> (usize, f32) {
    match (algorithm, window) {
        (Algorithm::Lstm, TimeWindow::H12) => (15, 0.40),
        (Algorithm::Lstm, TimeWindow::H24) => (12, 0.45),
        (Algorithm::Lstm, TimeWindow::H36) => (8, 0.45),
        (Algorithm::Lstm, TimeWindow::H48) => (15, 0.45),
        (Algorithm::Lstm, TimeWindow::H60) => (12, 0.50),
        (Algorithm::Gru, TimeWindow::H12) => (16, 0.45),
        (Algorithm::Gru, TimeWindow::H24) => (12, 0.40),
        (Algorithm::Gru, TimeWindow::H36) => (9, 0.45),
        (Algorithm::Gru, TimeWindow::H48) => (14, 0.45),
        (Algorithm::Gru, TimeWindow::H60) => (5, 0.50),
    }
}

#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    overrides: BTreeMap<ConfigKey, (usize, f32)>,
}

impl ModelRegistry {
    pub fn with_overrides(overrides: &[ModelOverride]) -> Self {
        let overrides = overrides
            .iter()
            .map(|o| {
                (
                    ConfigKey::new(o.algorithm, o.time_window),
                    (o.n_features, o.threshold),
                )
            })
            .collect();
        Self { overrides }
    }

    /// `(n_features, threshold)` for one configuration.
    pub fn get(&self, algorithm: Algorithm, window: TimeWindow) -> (usize, f32) {
        self.overrides
            .get(&ConfigKey::new(algorithm, window))
            .copied()
            .unwrap_or_else(|| tuned(algorithm, window))
    }

    pub fn configuration(&self, algorithm: Algorithm, window: TimeWindow) -> ModelConfiguration {
        let (n_features, threshold) = self.get(algorithm, window);
        ModelConfiguration {
            algorithm,
            window,
            n_features,
            threshold,
        }
    }
}
