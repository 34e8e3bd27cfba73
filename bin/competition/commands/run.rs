//! Run command - execute the competition sweep

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{presets::UTF8_FULL, Table};
use llm_competition::{CompetitionConfig, CompetitionReport, CompetitionRunner};
use std::path::PathBuf;
use tracing::info;

use crate::style::*;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// TOML config file (defaults are used when omitted)
    #[arg(short, long, env = "COMPETITION_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output directory for result artifacts
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Rounds per run
    #[arg(long)]
    pub rounds: Option<u32>,

    /// Runs per situation
    #[arg(long)]
    pub runs: Option<u32>,

    /// Situation to sweep (repeatable): baseline, emotional, explicit
    #[arg(long = "situation")]
    pub situations: Vec<String>,

    /// Call competitors of a round concurrently
    #[arg(long)]
    pub concurrent: bool,
}

impl RunArgs {
    fn load_config(&self) -> Result<CompetitionConfig> {
        let mut config = match &self.config {
            Some(path) => CompetitionConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => CompetitionConfig::default(),
        };

        if let Some(output) = &self.output {
            config.output_dir = output.clone();
        }
        if let Some(rounds) = self.rounds {
            config.rounds = rounds;
        }
        if let Some(runs) = self.runs {
            config.runs = runs;
        }
        if !self.situations.is_empty() {
            config.situations = self.situations.clone();
        }
        if self.concurrent {
            config.concurrent_dispatch = true;
        }
        Ok(config)
    }
}

pub async fn run(args: RunArgs) -> Result<()> {
    let config = args.load_config()?;

    print_banner("LLM Competition");
    print_field("Situations", &config.situations.join(", "));
    print_field("Runs", &config.runs.to_string());
    print_field("Rounds", &config.rounds.to_string());
    print_field(
        "Competitors",
        &config
            .competitors
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    );
    print_field("Judge", &config.judge.name);
    print_field("Output", &config.output_dir.display().to_string());

    let runner = CompetitionRunner::from_config(&config).context("Invalid configuration")?;
    let report = runner.run_all().await.context("Competition failed")?;
    info!("Results written to {:?}", runner.writer().output_dir());

    print_report(&report);
    Ok(())
}

fn print_report(report: &CompetitionReport) {
    print_section("Final Rankings");
    println!();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Situation", "Run", "Rounds", "Winner", "Ranking", "Status"]);

    for run in &report.runs {
        let ranking = run
            .final_ranking
            .iter()
            .map(|(name, rank)| format!("{}. {}", rank, name))
            .collect::<Vec<_>>()
            .join("\n");
        let status = run_status(run.error.as_deref());
        table.add_row(vec![
            run.situation.to_string(),
            run.run.to_string(),
            run.completed_rounds.to_string(),
            run.winner().unwrap_or("-").to_string(),
            ranking,
            status,
        ]);
    }
    println!("{table}");
    println!();

    print_outcome(report.completed(), report.aborted());
}
