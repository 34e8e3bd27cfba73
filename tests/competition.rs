//! End-to-end competition sweeps against in-process and mocked endpoints

use async_trait::async_trait;
use httpmock::prelude::*;
use llm_competition::{
    load_history, CompetitionConfig, CompetitionError, CompetitionRunner, Competitor, Dialect,
    EndpointConfig, Result, Situation, TextGenerator, DEFAULT_QUESTION,
};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Competitor answering "<name> round <n>" and recording its prompts
struct Recorder {
    name: String,
    prompts: Mutex<Vec<String>>,
}

impl Recorder {
    fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for Recorder {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let mut prompts = self.prompts.lock().unwrap();
        prompts.push(prompt.to_string());
        Ok(format!("{} round {}", self.name, prompts.len()))
    }
}

/// Judge replying with queued outputs, one per round
struct QueuedJudge {
    replies: Mutex<VecDeque<String>>,
}

impl QueuedJudge {
    fn new(replies: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
        })
    }
}

#[async_trait]
impl TextGenerator for QueuedJudge {
    fn name(&self) -> &str {
        "judge"
    }

    async fn generate(&self, _prompt: &str) -> Result<String> {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| CompetitionError::call_failed("judge", "no more replies"))
    }
}

fn sweep_config(dir: &Path, situations: &[&str], runs: u32, rounds: u32) -> CompetitionConfig {
    CompetitionConfig {
        situations: situations.iter().map(|s| s.to_string()).collect(),
        runs,
        rounds,
        output_dir: dir.to_path_buf(),
        ..CompetitionConfig::default()
    }
}

#[tokio::test]
async fn test_baseline_two_competitors_two_rounds() {
    let dir = tempfile::tempdir().unwrap();
    let alpha = Recorder::new("alpha");
    let beta = Recorder::new("beta");
    let judge = QueuedJudge::new(&[r#"{"results": ["2", "1"]}"#, r#"{"results": ["1", "2"]}"#]);

    let runner = CompetitionRunner::with_components(
        &sweep_config(dir.path(), &["baseline"], 1, 2),
        vec![
            Competitor::new("alpha", alpha.clone() as Arc<dyn TextGenerator>),
            Competitor::new("beta", beta.clone() as Arc<dyn TextGenerator>),
        ],
        judge,
    )
    .unwrap();

    let report = runner.run_all().await.unwrap();
    assert_eq!(report.runs.len(), 1);
    assert!(report.runs[0].success());
    assert_eq!(report.runs[0].winner(), Some("alpha"));

    // Round 1 starts everyone at rank 1 with the question as best response
    let alpha_prompts = alpha.prompts();
    let beta_prompts = beta.prompts();
    assert!(alpha_prompts[0].contains("ranked 1 out of 2"));
    assert!(beta_prompts[0].contains("ranked 1 out of 2"));
    assert!(alpha_prompts[0].contains(DEFAULT_QUESTION));

    assert!(alpha_prompts[1].contains("ranked 2 out of 2"));
    assert!(beta_prompts[1].contains("ranked 1 out of 2"));
    assert!(alpha_prompts[1].contains("beta round 1"));

    let run_dir = dir.path().join("baseline").join("run_1");
    let history = load_history(&run_dir.join("results.json")).unwrap();
    let rounds: Vec<u32> = history.rounds().iter().map(|r| r.round).collect();
    assert_eq!(rounds, vec![1, 2]);
    assert_eq!(history.rounds()[0].best_llm, "beta");
    assert_eq!(history.rounds()[1].best_response, "alpha round 2");

    assert!(run_dir.join("round_1.json").exists());
    assert!(run_dir.join("round_2.json").exists());
    assert!(run_dir.join("summary.json").exists());
}

#[tokio::test]
async fn test_judge_violation_aborts_only_that_run() {
    let dir = tempfile::tempdir().unwrap();
    // Leftover from an earlier, longer run into the same directory
    let stale_dir = dir.path().join("explicit/run_1");
    std::fs::create_dir_all(&stale_dir).unwrap();
    std::fs::write(stale_dir.join("round_2.json"), "{}").unwrap();
    let judge = QueuedJudge::new(&[
        // run 1: one good round, then a duplicate
        r#"{"results": ["1", "2"]}"#,
        r#"{"results": ["1", "1"]}"#,
        // run 2
        r#"{"results": ["2", "1"]}"#,
        r#"{"results": ["2", "1"]}"#,
    ]);

    let runner = CompetitionRunner::with_components(
        &sweep_config(dir.path(), &["explicit"], 2, 2),
        vec![
            Competitor::new("alpha", Recorder::new("alpha") as Arc<dyn TextGenerator>),
            Competitor::new("beta", Recorder::new("beta") as Arc<dyn TextGenerator>),
        ],
        judge,
    )
    .unwrap();

    let report = runner.run_all().await.unwrap();
    assert_eq!(report.runs.len(), 2);
    assert_eq!(report.aborted(), 1);

    let first = &report.runs[0];
    assert_eq!(first.situation, Situation::Explicit);
    assert_eq!(first.completed_rounds, 1);
    let reason = first.error.as_deref().unwrap();
    assert!(reason.contains("more than once"));
    assert!(reason.contains("round 2 failed while judging"));

    let second = &report.runs[1];
    assert!(second.success());
    assert_eq!(second.completed_rounds, 2);

    let partial = load_history(&dir.path().join("explicit/run_1/results.json")).unwrap();
    assert_eq!(partial.len(), 1);
    assert!(stale_dir.join("round_1.json").exists());
    assert!(!stale_dir.join("round_2.json").exists());
    assert!(dir.path().join("explicit/run_1/summary.json").exists());
}

#[tokio::test]
async fn test_sweep_over_http_endpoints() {
    let dir = tempfile::tempdir().unwrap();
    let chat = MockServer::start();
    let messages = MockServer::start();
    let judge = MockServer::start();

    let chat_mock = chat.mock(|when, then| {
        when.method(POST).path("/chat/completions");
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"choices": [{"message": {"role": "assistant", "content": "chat answer"}}]}"#);
    });
    let messages_mock = messages.mock(|when, then| {
        when.method(POST).path("/messages");
        then.status(500).body("overloaded");
    });
    let judge_mock = judge.mock(|when, then| {
        when.method(POST)
            .path("/chat/completions")
            .json_body_partial(r#"{"model": "judge-model", "max_tokens": 512}"#);
        then.status(200)
            .header("content-type", "application/json")
            .body(r#"{"choices": [{"message": {"content": "{\"results\": [\"1\", \"2\"]}"}}]}"#);
    });

    let endpoint = |name: &str, dialect: Dialect, base: String| EndpointConfig {
        name: name.to_string(),
        model: None,
        dialect,
        api_base: base,
        api_key_env: None,
        api_key: Some("test".to_string()),
    };

    let config = CompetitionConfig {
        competitors: vec![
            endpoint("chatty", Dialect::ChatCompletions, chat.base_url()),
            endpoint("claude", Dialect::Messages, messages.base_url()),
        ],
        judge: endpoint("judge-model", Dialect::ChatCompletions, judge.base_url()),
        concurrent_dispatch: true,
        timeout_secs: 5,
        ..sweep_config(dir.path(), &["emotional"], 1, 2)
    };

    let runner = CompetitionRunner::from_config(&config).unwrap();
    let report = runner.run_all().await.unwrap();

    chat_mock.assert_hits(2);
    messages_mock.assert_hits(2);
    judge_mock.assert_hits(2);

    assert!(report.runs[0].success());
    let history = load_history(&dir.path().join("emotional/run_1/results.json")).unwrap();
    let last = history.last().unwrap();
    assert_eq!(last.responses["chatty"], "chat answer");
    assert!(last.responses["claude"].starts_with("ERROR: "));
    assert!(last.responses["claude"].contains("500"));
    assert_eq!(last.best_llm, "chatty");
}
