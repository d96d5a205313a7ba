//! The `health` subcommand: probe the corpus and providers.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use clauseguard_core::PipelineConfig;
use clauseguard_pipeline::Coordinator;
use clauseguard_verify::AnomalyDetector;

use crate::display;
use crate::providers::ProviderArgs;

#[derive(Args, Debug)]
pub struct HealthArgs {
    /// Regulation corpus, one JSON rule per line.
    #[arg(long)]
    pub corpus: PathBuf,

    /// Print the status as JSON.
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub providers: ProviderArgs,
}

pub async fn run(args: HealthArgs) -> Result<()> {
    let providers = args.providers.build()?;
    let pipeline = Coordinator::from_corpus(
        &args.corpus,
        providers,
        AnomalyDetector::disabled(),
        PipelineConfig::default(),
    )?;
    let status = pipeline.health().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        display::print_health(&status);
    }
    if !status.healthy {
        bail!("pipeline unhealthy");
    }
    Ok(())
}
