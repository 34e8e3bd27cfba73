//! Competition results and export
//!
//! Layout under the output directory:
//!
//! ```text
//! {output_dir}/{situation}/run_{run}/
//!     round_1.json .. round_N.json   one record per finished round
//!     results.json                   every round of the run, in order
//!     summary.json                   final ranking, responses, abort reason
//! ```
//!
//! A run starts by removing the artifacts a previous run left in its
//! directory, so a shorter or aborted rerun never mixes with stale rounds.
//! Other files in the directory are left alone.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{CompetitionError, Result};
use crate::prompt::Situation;
use crate::round::{RoundRecord, RunHistory};

/// Final state of one (situation, run) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub situation: Situation,
    pub run: u32,
    pub completed_rounds: usize,
    pub final_ranking: IndexMap<String, usize>,
    pub final_responses: IndexMap<String, String>,
    /// Why the run stopped early, if it did
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
}

impl RunSummary {
    pub fn new(
        situation: Situation,
        run: u32,
        history: &RunHistory,
        error: Option<String>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let (final_ranking, final_responses) = history
            .last()
            .map(|r| (r.ranks.clone(), r.responses.clone()))
            .unwrap_or_default();

        Self {
            situation,
            run,
            completed_rounds: history.len(),
            final_ranking,
            final_responses,
            error,
            started_at,
            ended_at: Utc::now(),
        }
    }

    pub fn success(&self) -> bool {
        self.error.is_none()
    }

    /// Competitor ranked first in the last completed round
    pub fn winner(&self) -> Option<&str> {
        self.final_ranking
            .iter()
            .find(|(_, rank)| **rank == 1)
            .map(|(name, _)| name.as_str())
    }
}

/// Everything a sweep produced
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompetitionReport {
    pub runs: Vec<RunSummary>,
}

impl CompetitionReport {
    pub fn completed(&self) -> usize {
        self.runs.iter().filter(|r| r.success()).count()
    }

    pub fn aborted(&self) -> usize {
        self.runs.len() - self.completed()
    }
}

/// Writes run artifacts below a root directory
pub struct ResultWriter {
    output_dir: PathBuf,
}

impl ResultWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Directory for one (situation, run) pair
    pub fn run_dir(&self, situation: Situation, run: u32) -> PathBuf {
        self.output_dir
            .join(situation.as_str())
            .join(format!("run_{}", run))
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CompetitionError::Persistence {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string_pretty(value)?;
        std::fs::write(path, json).map_err(|source| CompetitionError::Persistence {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Remove run artifacts left by an earlier run into the same directory
    pub fn clear_run(&self, situation: Situation, run: u32) -> Result<()> {
        let dir = self.run_dir(situation, run);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(source) => return Err(CompetitionError::Persistence { path: dir, source }),
        };

        for entry in entries {
            let path = entry
                .map_err(|source| CompetitionError::Persistence {
                    path: dir.clone(),
                    source,
                })?
                .path();
            if !is_run_artifact(&path) {
                continue;
            }
            std::fs::remove_file(&path).map_err(|source| CompetitionError::Persistence {
                path: path.clone(),
                source,
            })?;
            debug!("Removed stale artifact {:?}", path);
        }
        Ok(())
    }

    /// Write `round_{n}.json`
    pub fn write_round(
        &self,
        situation: Situation,
        run: u32,
        record: &RoundRecord,
    ) -> Result<PathBuf> {
        let path = self
            .run_dir(situation, run)
            .join(format!("round_{}.json", record.round));
        self.write_json(&path, record)?;
        Ok(path)
    }

    /// Write `results.json` with every round of the run
    pub fn write_run(
        &self,
        situation: Situation,
        run: u32,
        history: &RunHistory,
    ) -> Result<PathBuf> {
        let path = self.run_dir(situation, run).join("results.json");
        self.write_json(&path, history)?;
        info!("Saved {} rounds to {:?}", history.len(), path);
        Ok(path)
    }

    /// Write `summary.json`
    pub fn write_summary(&self, summary: &RunSummary) -> Result<PathBuf> {
        let path = self
            .run_dir(summary.situation, summary.run)
            .join("summary.json");
        self.write_json(&path, summary)?;
        Ok(path)
    }
}

fn is_run_artifact(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name == "results.json"
        || name == "summary.json"
        || (name.starts_with("round_") && name.ends_with(".json"))
}

/// Load a `results.json` artifact
pub fn load_history(path: &Path) -> Result<RunHistory> {
    let text = std::fs::read_to_string(path).map_err(|source| CompetitionError::Persistence {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}
