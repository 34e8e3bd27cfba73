//! Error types for the competition harness

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while configuring or running a competition.
///
/// Propagation policy:
/// - `InvalidConfiguration` aborts before any network call.
/// - `ExternalCallFailure` from a competitor is absorbed into that
///   competitor's response slot; from the judge it ends the run.
/// - `JudgeProtocolViolation` ends the current run, never the sweep.
#[derive(Debug, Error)]
pub enum CompetitionError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Call to {endpoint} failed: {message}")]
    ExternalCallFailure { endpoint: String, message: String },

    #[error("Judge protocol violation: {0}")]
    JudgeProtocolViolation(#[from] JudgeViolation),

    #[error("Failed to write {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CompetitionError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub fn call_failed(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalCallFailure {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Whether the error ends the current run but not the sweep
    pub fn aborts_run_only(&self) -> bool {
        matches!(
            self,
            Self::JudgeProtocolViolation(_) | Self::ExternalCallFailure { .. }
        )
    }
}

/// Ways a judge reply can fail to be a ranking permutation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JudgeViolation {
    #[error("judge output is not valid JSON: {0}")]
    NotJson(String),

    #[error("judge output has no \"results\" array")]
    MissingResults,

    #[error("judge ranked {got} competitors, expected {expected}")]
    WrongLength { expected: usize, got: usize },

    #[error("judge entry {0:?} is not a competitor number")]
    NotAnIndex(String),

    #[error("judge entry {index} is outside 1..={count}")]
    OutOfRange { index: usize, count: usize },

    #[error("judge ranked competitor {0} more than once")]
    Duplicate(usize),
}

pub type Result<T> = std::result::Result<T, CompetitionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_judge_violation_converts() {
        let err: CompetitionError = JudgeViolation::Duplicate(1).into();
        assert!(matches!(
            err,
            CompetitionError::JudgeProtocolViolation(JudgeViolation::Duplicate(1))
        ));
        assert!(err.aborts_run_only());
    }

    #[test]
    fn test_config_error_is_fatal() {
        let err = CompetitionError::config("unknown situation: angry");
        assert!(!err.aborts_run_only());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: unknown situation: angry"
        );
    }
}
