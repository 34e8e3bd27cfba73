//! Config command - print the default configuration

use anyhow::{Context, Result};
use llm_competition::CompetitionConfig;

pub fn print_default() -> Result<()> {
    let toml = CompetitionConfig::default()
        .to_toml()
        .context("Failed to render default config")?;
    print!("{}", toml);
    Ok(())
}
