mod analyze;
mod display;
mod health;
mod providers;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "clauseguard",
    version,
    about = "Clause-level regulatory compliance verification"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Verify a document's clauses against the regulation corpus.
    Analyze(analyze::AnalyzeArgs),
    /// Probe the corpus and the configured providers.
    Health(health::HealthArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    tracing::info!("clauseguard v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    match cli.command {
        Command::Analyze(args) => analyze::run(args).await,
        Command::Health(args) => health::run(args).await,
    }
}
