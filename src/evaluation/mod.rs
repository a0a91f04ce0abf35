//! Threshold-free (ROC, AUROC) and threshold-dependent (skill scores)
//! evaluation of prediction results.

mod aggregator;
mod roc;
mod skill;

pub use aggregator::{legend, ConfigurationMetrics, EvaluationAggregator};
pub use roc::{RocCurve, RocPoint};
pub use skill::SkillScores;
