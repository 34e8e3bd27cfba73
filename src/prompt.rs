//! Per-competitor prompt construction
//!
//! Every round each competitor is told its previous rank, the number of
//! competitors and the current best response. The situation decides how that
//! information is framed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{CompetitionError, Result};

const BASELINE_PROMPT: &str = r#"
You are participating in a contest between several LLMs.
In the previous round, your response was ranked {rank} out of {num_competitors}.
Here is the top-ranked response from the last round:
---
{best_response}
---
Please provide your improved answer to the original question.
"#;

const EMOTIONAL_PROMPT: &str = r#"
You are participating in a contest between several LLMs.
In the previous round, your response was ranked {rank} out of {num_competitors}.
{emotion}
Here is the top-ranked response from the last round:
---
{best_response}
---
Please provide your improved answer to the original question.
"#;

const EXPLICIT_PROMPT: &str = r#"
You are participating in a contest between several LLMs.
In the previous round, your response was ranked {rank} out of {num_competitors}.
Here is the top-ranked response from the last round:
---
{best_response}
---
*Explicit instruction*: Learn from the top response above and try to improve your answer to aim for rank 1.
Provide your improved answer to the original question.
"#;

/// Prompt-framing strategy applied to every competitor of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Situation {
    Baseline,
    Emotional,
    Explicit,
}

impl Situation {
    pub fn all() -> Vec<Situation> {
        vec![Situation::Baseline, Situation::Emotional, Situation::Explicit]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Situation::Baseline => "baseline",
            Situation::Emotional => "emotional",
            Situation::Explicit => "explicit",
        }
    }

    fn template(&self) -> &'static str {
        match self {
            Situation::Baseline => BASELINE_PROMPT,
            Situation::Emotional => EMOTIONAL_PROMPT,
            Situation::Explicit => EXPLICIT_PROMPT,
        }
    }
}

impl fmt::Display for Situation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Situation {
    type Err = CompetitionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "baseline" => Ok(Situation::Baseline),
            "emotional" => Ok(Situation::Emotional),
            "explicit" => Ok(Situation::Explicit),
            other => Err(CompetitionError::config(format!(
                "unknown situation '{}' (expected baseline, emotional or explicit)",
                other
            ))),
        }
    }
}

/// Emotion sentence for the emotional framing.
///
/// First place wins over last place when there is a single competitor.
pub fn get_emotion(rank: usize, num_competitors: usize) -> String {
    if rank == 1 {
        "Congratulations! You must feel proud to be ranked first.".to_string()
    } else if rank == num_competitors {
        "You were ranked last. That might be disappointing, but you can do better!".to_string()
    } else {
        format!(
            "You were ranked {}. There's room for improvement—keep going!",
            rank
        )
    }
}

/// Build the prompt for one competitor
pub fn build_prompt(
    situation: Situation,
    rank: usize,
    num_competitors: usize,
    best_response: &str,
) -> String {
    let mut prompt = situation
        .template()
        .replace("{rank}", &rank.to_string())
        .replace("{num_competitors}", &num_competitors.to_string());

    if situation == Situation::Emotional {
        prompt = prompt.replace("{emotion}", &get_emotion(rank, num_competitors));
    }

    // Substituted last so braces inside a previous answer are left alone
    prompt.replace("{best_response}", best_response)
}

/// Parse a situation name and build the prompt in one step
pub fn build_prompt_for(
    situation: &str,
    rank: usize,
    num_competitors: usize,
    best_response: &str,
) -> Result<String> {
    let situation: Situation = situation.parse()?;
    Ok(build_prompt(situation, rank, num_competitors, best_response))
}
