//! Structured logging.

mod format;

pub use format::{OutcomeEvent, StructuredLogger};
