//! Round executor
//!
//! One round moves through `Dispatching -> Judging -> Finalizing -> Complete`:
//! every competitor answers its own prompt, the judge orders the answers,
//! the top answer becomes the best response for the next round.

use futures::future::join_all;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::{CompetitionError, Result};
use crate::judge::{check_order, ranks_from_order, Judge};
use crate::llm::TextGenerator;
use crate::prompt::{build_prompt, Situation};

/// Characters of each answer shown in the round log
const PREVIEW_CHARS: usize = 100;

/// Phase of a round in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Dispatching,
    Judging,
    Finalizing,
    Complete,
}

impl fmt::Display for RoundPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoundPhase::Dispatching => "dispatching",
            RoundPhase::Judging => "judging",
            RoundPhase::Finalizing => "finalizing",
            RoundPhase::Complete => "complete",
        };
        f.write_str(s)
    }
}

/// A named participant bound to one text generator
#[derive(Clone)]
pub struct Competitor {
    pub name: String,
    generator: Arc<dyn TextGenerator>,
}

impl Competitor {
    pub fn new(name: impl Into<String>, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            name: name.into(),
            generator,
        }
    }

    /// Ask for an answer. Failures are folded into the answer text so the
    /// round can go on.
    pub async fn answer(&self, prompt: &str) -> String {
        debug!("Prompt for {}:\n{}", self.name, prompt);
        match self.generator.generate(prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!("{} failed, continuing with error text: {}", self.name, e);
                format!("ERROR: {}", e)
            }
        }
    }
}

/// Record of one finished round, as persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: u32,
    /// Competitor name -> answer, in competitor order
    pub responses: IndexMap<String, String>,
    /// Competitor name -> rank (1 = best), in rank order
    pub ranks: IndexMap<String, usize>,
    pub best_llm: String,
    pub best_response: String,
}

/// Ordered rounds of one (situation, run) pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunHistory {
    rounds: Vec<RoundRecord>,
}

impl RunHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: RoundRecord) {
        self.rounds.push(record);
    }

    pub fn rounds(&self) -> &[RoundRecord] {
        &self.rounds
    }

    pub fn last(&self) -> Option<&RoundRecord> {
        self.rounds.last()
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }
}

/// Rank each competitor starts round 1 with
pub const INITIAL_RANK: usize = 1;

/// Starting rank map: every competitor at rank 1
pub fn initial_ranks(competitors: &[Competitor]) -> IndexMap<String, usize> {
    competitors
        .iter()
        .map(|c| (c.name.clone(), INITIAL_RANK))
        .collect()
}

/// Drives single rounds for a fixed field of competitors
pub struct RoundExecutor {
    competitors: Vec<Competitor>,
    judge: Judge,
    concurrent: bool,
}

impl RoundExecutor {
    /// Competitor names key the response and rank maps, so they must be
    /// unique and the field must not be empty.
    pub fn new(competitors: Vec<Competitor>, judge: Judge) -> Result<Self> {
        if competitors.is_empty() {
            return Err(CompetitionError::config("no competitors configured"));
        }
        let mut seen = HashSet::with_capacity(competitors.len());
        for c in &competitors {
            if !seen.insert(c.name.as_str()) {
                return Err(CompetitionError::config(format!(
                    "duplicate competitor name: {}",
                    c.name
                )));
            }
        }

        Ok(Self {
            competitors,
            judge,
            concurrent: false,
        })
    }

    /// Dispatch competitor calls of a round concurrently
    pub fn with_concurrency(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    pub fn competitors(&self) -> &[Competitor] {
        &self.competitors
    }

    pub fn names(&self) -> Vec<String> {
        self.competitors.iter().map(|c| c.name.clone()).collect()
    }

    /// Dispatching: every competitor answers the prompt built from its
    /// previous rank. Responses come back in competitor order.
    pub async fn dispatch(
        &self,
        situation: Situation,
        previous_ranks: &IndexMap<String, usize>,
        best_response: &str,
    ) -> IndexMap<String, String> {
        let count = self.competitors.len();
        let prompts: Vec<(usize, String)> = self
            .competitors
            .iter()
            .map(|c| {
                let rank = previous_ranks.get(&c.name).copied().unwrap_or(INITIAL_RANK);
                (rank, build_prompt(situation, rank, count, best_response))
            })
            .collect();

        let answers: Vec<String> = if self.concurrent {
            join_all(
                self.competitors
                    .iter()
                    .zip(&prompts)
                    .map(|(c, (_, prompt))| c.answer(prompt)),
            )
            .await
        } else {
            let mut answers = Vec::with_capacity(count);
            for (c, (_, prompt)) in self.competitors.iter().zip(&prompts) {
                answers.push(c.answer(prompt).await);
            }
            answers
        };

        let mut responses = IndexMap::with_capacity(count);
        for ((c, (rank, _)), answer) in self.competitors.iter().zip(&prompts).zip(answers) {
            info!("{} (rank {}): {}...", c.name, rank, preview(&answer));
            responses.insert(c.name.clone(), answer);
        }
        responses
    }

    /// Judging: order the responses, best first, as 1-based positions
    pub async fn rank_responses(&self, responses: &IndexMap<String, String>) -> Result<Vec<usize>> {
        let texts: Vec<&str> = responses.values().map(String::as_str).collect();
        self.judge.rank(&texts).await
    }

    /// Finalizing: derive the rank map and carry the winner forward
    pub fn finalize(
        &self,
        round: u32,
        responses: IndexMap<String, String>,
        order: &[usize],
    ) -> Result<RoundRecord> {
        let names: Vec<String> = responses.keys().cloned().collect();
        check_order(order, names.len())?;

        let ranks = ranks_from_order(order, &names);
        let (best_llm, best_response) = order
            .first()
            .and_then(|&index| responses.get_index(index - 1))
            .map(|(name, text)| (name.clone(), text.clone()))
            .ok_or_else(|| CompetitionError::config("round has no responses"))?;

        info!("Ranking: {:?}", ranks);

        Ok(RoundRecord {
            round,
            responses,
            ranks,
            best_llm,
            best_response,
        })
    }

    /// Run one full round. A failure reports the phase it stopped in.
    pub async fn execute(
        &self,
        round: u32,
        situation: Situation,
        previous_ranks: &IndexMap<String, usize>,
        best_response: &str,
    ) -> std::result::Result<RoundRecord, RoundFailure> {
        debug!("Round {} {}", round, RoundPhase::Dispatching);
        let responses = self.dispatch(situation, previous_ranks, best_response).await;

        debug!("Round {} {} with {}", round, RoundPhase::Judging, self.judge.name());
        let order = self
            .rank_responses(&responses)
            .await
            .map_err(|e| RoundFailure::new(round, RoundPhase::Judging, e))?;

        debug!("Round {} {}", round, RoundPhase::Finalizing);
        let record = self
            .finalize(round, responses, &order)
            .map_err(|e| RoundFailure::new(round, RoundPhase::Finalizing, e))?;

        debug!("Round {} {}: best={}", round, RoundPhase::Complete, record.best_llm);
        Ok(record)
    }
}

/// A round that stopped before `Complete`
#[derive(Debug, Error)]
#[error("round {round} failed while {phase}: {error}")]
pub struct RoundFailure {
    pub round: u32,
    /// Phase the round was in when it failed
    pub phase: RoundPhase,
    #[source]
    pub error: CompetitionError,
}

impl RoundFailure {
    fn new(round: u32, phase: RoundPhase, error: CompetitionError) -> Self {
        warn!("Round {} failed while {}: {}", round, phase, error);
        Self {
            round,
            phase,
            error,
        }
    }
}

fn preview(text: &str) -> String {
    text.chars().take(PREVIEW_CHARS).collect()
}
