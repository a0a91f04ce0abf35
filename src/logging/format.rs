//! Log setup plus NDJSON outcome lines, one JSON object per configuration.

use crate::report::{ConfigurationEntry, EvaluationReport};
use serde::Serialize;
use std::io::Write;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Outcome of one grid configuration.
#[derive(Debug, Serialize)]
pub struct OutcomeEvent<'a> {
    pub ts: String,
    pub level: &'a str,
    pub configuration: &'a str,
    pub message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auroc: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tss: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'a str>,
}

impl<'a> OutcomeEvent<'a> {
    pub fn scored(entry: &'a ConfigurationEntry, ts: String) -> Self {
        Self {
            ts,
            level: if entry.metric_error.is_some() { "WARN" } else { "INFO" },
            configuration: &entry.configuration,
            message: "configuration evaluated",
            samples: Some(entry.samples),
            auroc: entry.auroc,
            tss: entry.skill.tss,
            error: entry.metric_error.as_deref(),
        }
    }
}

/// Initialize tracing: text or JSON lines on stderr, level from RUST_LOG or default.
pub struct StructuredLogger;

impl StructuredLogger {
    /// Install the global subscriber. Calling twice is a no-op.
    pub fn init(json: bool, default_level: &str) {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
        let registry = tracing_subscriber::registry().with(filter);
        let _ = if json {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_span_events(FmtSpan::NONE)
                        .with_writer(std::io::stderr),
                )
                .try_init()
        } else {
            registry
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .try_init()
        };
    }

    /// Emit a single structured line without going through tracing.
    pub fn emit_json(event: &impl Serialize, w: &mut impl Write) {
        if let Ok(line) = serde_json::to_string(event) {
            let _ = writeln!(w, "{}", line);
        }
    }

    /// One line per scored configuration and per failure.
    pub fn emit_report(report: &EvaluationReport, w: &mut impl Write) {
        let ts = report.generated_at.to_rfc3339();
        for entry in &report.configurations {
            Self::emit_json(&OutcomeEvent::scored(entry, ts.clone()), w);
        }
        for failure in &report.failures {
            let configuration = failure.configuration.to_string();
            Self::emit_json(
                &OutcomeEvent {
                    ts: ts.clone(),
                    level: "ERROR",
                    configuration: &configuration,
                    message: "configuration failed",
                    samples: None,
                    auroc: None,
                    tss: None,
                    error: Some(&failure.message),
                },
                w,
            );
        }
    }
}
