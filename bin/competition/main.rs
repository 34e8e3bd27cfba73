//! `competition` - run multi-round LLM competitions

mod commands;
mod style;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "competition", about = "Multi-round LLM competition with a judge model")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the situation x run x round sweep
    Run(commands::run::RunArgs),

    /// Print the default configuration as TOML
    Config,

    /// Show the rounds of an existing results.json
    Show {
        /// Path to a results.json artifact
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run(args) => commands::run::run(args).await,
        Commands::Config => commands::config::print_default(),
        Commands::Show { path } => commands::show::show(&path),
    }
}
