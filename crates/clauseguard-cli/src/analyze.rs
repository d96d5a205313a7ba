//! The `analyze` subcommand: run the pipeline over one document file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use clauseguard_core::{Document, PipelineConfig};
use clauseguard_pipeline::Coordinator;
use clauseguard_verify::AnomalyDetector;

use crate::display;
use crate::providers::ProviderArgs;

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Extracted document JSON: {document_id, clauses: [...]}.
    #[arg(long)]
    pub document: PathBuf,

    /// Regulation corpus, one JSON rule per line.
    #[arg(long)]
    pub corpus: PathBuf,

    /// Pipeline configuration JSON; defaults apply when omitted.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Trained isolation-forest model; anomaly scoring is disabled
    /// without it.
    #[arg(long)]
    pub anomaly_model: Option<PathBuf>,

    /// Override the configured clause worker count.
    #[arg(long)]
    pub workers: Option<usize>,

    /// Override the configured document deadline in milliseconds.
    #[arg(long)]
    pub document_deadline_ms: Option<u64>,

    /// Print the raw report JSON instead of the card.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub providers: ProviderArgs,
}

pub async fn run(args: AnalyzeArgs) -> Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(deadline) = args.document_deadline_ms {
        config.document_deadline_ms = Some(deadline);
    }
    let document = load_document(&args.document)?;

    let detector = match &args.anomaly_model {
        Some(path) => AnomalyDetector::from_file(path, config.anomaly.threshold),
        None => AnomalyDetector::disabled(),
    };
    let providers = args.providers.build()?;
    let pipeline = Coordinator::from_corpus(&args.corpus, providers, detector, config)?;

    let report = pipeline
        .process(&document.document_id, document.clauses)
        .await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        display::print_report(&report);
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing config {}", path.display()))
}

fn load_document(path: &Path) -> Result<Document> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading document {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing document {}", path.display()))
}
