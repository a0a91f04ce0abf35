//! cme-predict entrypoint: evaluates the configured (algorithm, window) grid
//! against the testing tables, or trains one configuration's model.

use clap::{Parser, Subcommand};
use cme_predict::{
    config::{PipelineConfig, CONFIG_ENV},
    features::PaddedSequenceBuilder,
    logging::StructuredLogger,
    model::{Algorithm, FileModelProvider, TimeWindow},
    pipeline::{ensure_dir, train_configuration, CsvTableSource, GridRunner},
    report::{EvaluationReport, REPORT_FILE, ROC_FILE},
};
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "cme-predict", version, about = "CME prediction from SHARP flare sequences")]
struct Cli {
    /// Config file (falls back to $CME_PREDICT_CONFIG, then config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score every grid configuration and write the evaluation report
    Evaluate,
    /// Fit and save the model for one configuration
    Train {
        #[arg(long)]
        algorithm: Algorithm,
        /// Hours: 12, 24, 36, 48 or 60
        #[arg(long)]
        window: TimeWindow,
    },
}

fn config_path(flag: Option<PathBuf>) -> PathBuf {
    flag.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("config.json"))
}

fn evaluate(config: &PipelineConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let source = CsvTableSource::new(config);
    let provider = FileModelProvider::new(config);
    let builder = PaddedSequenceBuilder::new(&config.sequence);

    let outcome = GridRunner::new(config, &source, &provider, &builder).run();
    let metrics = outcome.aggregator.evaluate();
    let report = EvaluationReport::from_outcome(&outcome, &metrics);

    ensure_dir(&config.output_dir)?;
    let report_path = config.output_dir.join(REPORT_FILE);
    let roc_path = config.output_dir.join(ROC_FILE);
    report.write_json(&report_path)?;
    report.write_roc_csv(&roc_path)?;
    info!(report = %report_path.display(), roc = %roc_path.display(), "report written");

    if config.log.json {
        StructuredLogger::emit_report(&report, &mut std::io::stdout().lock());
    } else {
        print!("{}", report.render_text());
    }

    if outcome.all_failed() {
        error!(failed = outcome.failures.len(), "no configuration could be evaluated");
        return Err("every configuration failed".into());
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let config_path = config_path(cli.config);
    let config = PipelineConfig::load(&config_path)?;

    StructuredLogger::init(config.log.json, &config.log.level);
    info!(config = %config_path.display(), data_dir = ?config.data_dir, "cme-predict starting");

    match cli.command {
        Command::Evaluate => evaluate(&config)?,
        Command::Train { algorithm, window } => {
            let source = CsvTableSource::new(&config);
            let provider = FileModelProvider::new(&config);
            let builder = PaddedSequenceBuilder::new(&config.sequence);
            let (path, summary) =
                train_configuration(&config, &provider, &builder, &source, algorithm, window)?;
            println!(
                "{}-{}: {} samples ({} positive), final loss {:.4}, saved to {}",
                algorithm,
                window,
                summary.samples,
                summary.positives,
                summary.final_loss().unwrap_or(f32::NAN),
                path.display()
            );
        }
    }
    Ok(())
}
