//! Multi-round LLM competition
//!
//! Several LLMs answer the same question, a judge LLM ranks the answers,
//! and the best answer is fed back to every competitor in the next round.
//!
//! ## Module Structure
//!
//! - `config`: competition configuration (TOML)
//! - `prompt`: situations and per-competitor prompt templates
//! - `llm`: text-generation clients (chat-completions and messages dialects)
//! - `judge`: judge prompt and ranking validation
//! - `round`: round executor and run history
//! - `runner`: situation x run sweep
//! - `results`: JSON artifacts and run summaries

pub mod config;
pub mod error;
pub mod judge;
pub mod llm;
pub mod prompt;
pub mod results;
pub mod round;
pub mod runner;

pub use config::{CompetitionConfig, EndpointConfig, DEFAULT_QUESTION};
pub use error::{CompetitionError, JudgeViolation, Result};
pub use judge::{build_judge_prompt, check_order, parse_judge_output, Judge};
pub use llm::{Dialect, HttpGenerator, TextGenerator};
pub use prompt::{build_prompt, build_prompt_for, get_emotion, Situation};
pub use results::{load_history, CompetitionReport, ResultWriter, RunSummary};
pub use round::{
    initial_ranks, Competitor, RoundExecutor, RoundFailure, RoundPhase, RoundRecord, RunHistory,
    INITIAL_RANK,
};
pub use runner::CompetitionRunner;
