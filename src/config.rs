//! Competition Configuration
//!
//! Defines everything a competition sweep needs:
//! - Situations to sweep and how many runs/rounds each gets
//! - Competitor registry (name, wire dialect, endpoint, credentials)
//! - Judge endpoint
//! - Output caps, timeouts and the output directory

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{CompetitionError, Result};
use crate::llm::Dialect;
use crate::prompt::Situation;

pub const DEFAULT_QUESTION: &str = "What ethical frameworks should be established to govern the development and deployment of AGI, considering potential impacts on society, employment, and individual rights?";

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";

/// One text-generation endpoint, used for competitors and the judge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Identity in results; also the model name unless `model` is set
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub dialect: Dialect,
    pub api_base: String,
    /// Environment variable holding the API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
    /// Literal key, wins over `api_key_env` (local servers)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl EndpointConfig {
    pub fn new(name: &str, dialect: Dialect, api_base: &str, api_key_env: &str) -> Self {
        Self {
            name: name.to_string(),
            model: None,
            dialect,
            api_base: api_base.to_string(),
            api_key_env: Some(api_key_env.to_string()),
            api_key: None,
        }
    }

    pub fn openai(name: &str) -> Self {
        Self::new(name, Dialect::ChatCompletions, OPENAI_API_BASE, "OPENAI_API_KEY")
    }

    pub fn anthropic(name: &str) -> Self {
        Self::new(name, Dialect::Messages, ANTHROPIC_API_BASE, "ANTHROPIC_API_KEY")
    }

    /// Model identifier sent on the wire
    pub fn model_id(&self) -> &str {
        self.model.as_deref().unwrap_or(&self.name)
    }

    /// Resolve the API key: literal first, then the environment
    pub fn resolve_api_key(&self) -> Result<String> {
        if let Some(key) = &self.api_key {
            return Ok(key.clone());
        }
        match &self.api_key_env {
            Some(var) => std::env::var(var).map_err(|_| {
                CompetitionError::config(format!(
                    "{}: environment variable {} is not set",
                    self.name, var
                ))
            }),
            None => Err(CompetitionError::config(format!(
                "{}: neither api_key nor api_key_env is configured",
                self.name
            ))),
        }
    }

    fn validate(&self, role: &str) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(CompetitionError::config(format!("{} has an empty name", role)));
        }
        if self.api_base.trim().is_empty() {
            return Err(CompetitionError::config(format!(
                "{} {} has an empty api_base",
                role, self.name
            )));
        }
        Ok(())
    }
}

/// Complete competition configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompetitionConfig {
    /// Situations to sweep, by name
    pub situations: Vec<String>,
    /// Independent repeats per situation
    pub runs: u32,
    /// Rounds per run
    pub rounds: u32,
    /// Task question shown to the judge; also the round-1 best response
    pub question: String,
    /// Root directory for result artifacts
    pub output_dir: PathBuf,
    /// Dispatch competitor calls of a round concurrently
    pub concurrent_dispatch: bool,
    pub competitor_max_tokens: u32,
    pub judge_max_tokens: u32,
    /// Per-call timeout
    pub timeout_secs: u64,
    pub competitors: Vec<EndpointConfig>,
    pub judge: EndpointConfig,
}

impl Default for CompetitionConfig {
    fn default() -> Self {
        let local = EndpointConfig {
            name: "llama3.2".to_string(),
            model: None,
            dialect: Dialect::ChatCompletions,
            api_base: "http://localhost:11434/v1".to_string(),
            api_key_env: None,
            api_key: Some("ollama".to_string()),
        };

        Self {
            situations: Situation::all()
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
            runs: 4,
            rounds: 3,
            question: DEFAULT_QUESTION.to_string(),
            output_dir: PathBuf::from("llm_competition_experiment"),
            concurrent_dispatch: false,
            competitor_max_tokens: 1024,
            judge_max_tokens: 512,
            timeout_secs: 120,
            competitors: vec![
                EndpointConfig::openai("gpt-4o-mini"),
                EndpointConfig::anthropic("claude-3-7-sonnet-latest"),
                EndpointConfig::new(
                    "gemini-2.0-flash",
                    Dialect::ChatCompletions,
                    "https://generativelanguage.googleapis.com/v1beta/openai",
                    "GOOGLE_API_KEY",
                ),
                EndpointConfig::new(
                    "deepseek-chat",
                    Dialect::ChatCompletions,
                    "https://api.deepseek.com/v1",
                    "DEEPSEEK_API_KEY",
                ),
                EndpointConfig::new(
                    "llama-3.3-70b-versatile",
                    Dialect::ChatCompletions,
                    "https://api.groq.com/openai/v1",
                    "GROQ_API_KEY",
                ),
                local,
            ],
            judge: EndpointConfig::openai("gpt-4o-mini"),
        }
    }
}

impl CompetitionConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            CompetitionError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&text).map_err(|e| {
            CompetitionError::config(format!("cannot parse {}: {}", path.display(), e))
        })?;

        info!(
            "Loaded competition config from {:?}: {} competitors, judge={}",
            path,
            config.competitors.len(),
            config.judge.name
        );
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| CompetitionError::config(format!("cannot render config: {}", e)))
    }

    /// Parsed situations, in sweep order
    pub fn parsed_situations(&self) -> Result<Vec<Situation>> {
        self.situations.iter().map(|s| s.parse()).collect()
    }

    /// Check the configuration before any network call is made
    pub fn validate(&self) -> Result<()> {
        if self.situations.is_empty() {
            return Err(CompetitionError::config("no situations configured"));
        }
        self.parsed_situations()?;

        if self.runs == 0 {
            return Err(CompetitionError::config("runs must be at least 1"));
        }
        if self.rounds == 0 {
            return Err(CompetitionError::config("rounds must be at least 1"));
        }
        if self.question.trim().is_empty() {
            return Err(CompetitionError::config("question is empty"));
        }
        if self.competitor_max_tokens == 0 || self.judge_max_tokens == 0 {
            return Err(CompetitionError::config("max_tokens caps must be positive"));
        }
        if self.competitors.is_empty() {
            return Err(CompetitionError::config("no competitors configured"));
        }

        let mut seen = HashSet::new();
        for competitor in &self.competitors {
            competitor.validate("competitor")?;
            if !seen.insert(competitor.name.as_str()) {
                return Err(CompetitionError::config(format!(
                    "duplicate competitor name: {}",
                    competitor.name
                )));
            }
        }
        self.judge.validate("judge")
    }
}
