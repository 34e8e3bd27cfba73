//! Scenario driver: situations x runs x rounds

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, instrument};

use crate::config::CompetitionConfig;
use crate::error::Result;
use crate::judge::Judge;
use crate::llm::{HttpGenerator, TextGenerator};
use crate::prompt::Situation;
use crate::results::{CompetitionReport, ResultWriter, RunSummary};
use crate::round::{initial_ranks, Competitor, RoundExecutor, RunHistory};

/// Runs every configured (situation, run) pair and persists the results
pub struct CompetitionRunner {
    situations: Vec<Situation>,
    runs: u32,
    rounds: u32,
    question: String,
    executor: RoundExecutor,
    writer: ResultWriter,
}

impl CompetitionRunner {
    /// Build HTTP clients for every endpoint in the config.
    ///
    /// Fails with `InvalidConfiguration` before any request is sent.
    pub fn from_config(config: &CompetitionConfig) -> Result<Self> {
        config.validate()?;

        let mut competitors = Vec::with_capacity(config.competitors.len());
        for endpoint in &config.competitors {
            let client = HttpGenerator::new(
                endpoint,
                config.competitor_max_tokens,
                config.timeout_secs,
            )?;
            competitors.push(Competitor::new(
                endpoint.name.clone(),
                Arc::new(client) as Arc<dyn TextGenerator>,
            ));
        }

        let judge_client =
            HttpGenerator::new(&config.judge, config.judge_max_tokens, config.timeout_secs)?;

        Self::with_components(config, competitors, Arc::new(judge_client))
    }

    /// Assemble a runner from already-built generators
    pub fn with_components(
        config: &CompetitionConfig,
        competitors: Vec<Competitor>,
        judge: Arc<dyn TextGenerator>,
    ) -> Result<Self> {
        config.validate()?;

        let judge = Judge::new(judge, config.question.clone());
        let executor =
            RoundExecutor::new(competitors, judge)?.with_concurrency(config.concurrent_dispatch);

        Ok(Self {
            situations: config.parsed_situations()?,
            runs: config.runs,
            rounds: config.rounds,
            question: config.question.clone(),
            executor,
            writer: ResultWriter::new(config.output_dir.clone()),
        })
    }

    pub fn writer(&self) -> &ResultWriter {
        &self.writer
    }

    /// Sweep all situations and runs.
    ///
    /// A run stopped by the judge is logged and recorded; the sweep moves on.
    /// Persistence failures end the sweep.
    pub async fn run_all(&self) -> Result<CompetitionReport> {
        let mut report = CompetitionReport::default();

        for &situation in &self.situations {
            for run in 1..=self.runs {
                info!("--- Situation: {} | Run {} ---", situation, run);
                let summary = self.run_one(situation, run).await?;
                report.runs.push(summary);
            }
        }

        info!(
            "Competition finished: {} runs completed, {} aborted",
            report.completed(),
            report.aborted()
        );
        Ok(report)
    }

    /// Play one run from a fresh history and write its artifacts
    #[instrument(skip(self), fields(situation = %situation))]
    pub async fn run_one(&self, situation: Situation, run: u32) -> Result<RunSummary> {
        let started_at = Utc::now();
        let mut history = RunHistory::new();
        let mut last_ranks = initial_ranks(self.executor.competitors());
        let mut best_response = self.question.clone();
        let mut abort_reason = None;
        self.writer.clear_run(situation, run)?;

        for round in 1..=self.rounds {
            info!("Round {}", round);
            match self
                .executor
                .execute(round, situation, &last_ranks, &best_response)
                .await
            {
                Ok(record) => {
                    self.writer.write_round(situation, run, &record)?;
                    best_response = record.best_response.clone();
                    last_ranks = record.ranks.clone();
                    history.push(record);
                }
                Err(failure) if failure.error.aborts_run_only() => {
                    error!("Run {} of {} stopped: {}", run, situation, failure);
                    abort_reason = Some(failure.to_string());
                    break;
                }
                Err(failure) => return Err(failure.error),
            }
        }

        self.writer.write_run(situation, run, &history)?;
        let summary = RunSummary::new(situation, run, &history, abort_reason, started_at);
        self.writer.write_summary(&summary)?;

        if let Some(last) = history.last() {
            info!("Final ranking: {:?}", last.ranks);
        }
        Ok(summary)
    }
}
