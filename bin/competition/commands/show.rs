//! Show command - print an existing results.json

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Table};
use llm_competition::load_history;
use std::path::Path;

use crate::style::*;

/// Characters of the best response shown per round
const BEST_PREVIEW: usize = 60;

pub fn show(path: &Path) -> Result<()> {
    let history =
        load_history(path).with_context(|| format!("Failed to read {}", path.display()))?;

    print_banner("Competition Results");
    print_field("File", &path.display().to_string());
    print_field("Rounds", &history.len().to_string());

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Round", "Ranking", "Best", "Best response"]);

    for record in history.rounds() {
        let ranking = record
            .ranks
            .iter()
            .map(|(name, rank)| format!("{}. {}", rank, name))
            .collect::<Vec<_>>()
            .join("\n");
        let best: String = record.best_response.chars().take(BEST_PREVIEW).collect();
        table.add_row(vec![
            record.round.to_string(),
            ranking,
            record.best_llm.clone(),
            format!("{}...", best.replace('\n', " ")),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}
