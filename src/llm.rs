//! Text-generation clients for competitors and the judge
//!
//! Two wire dialects are supported, chosen per endpoint in the config:
//! - `chat-completions`: `POST {api_base}/chat/completions`, bearer auth,
//!   answer at `choices[0].message.content`
//! - `messages`: `POST {api_base}/messages`, `x-api-key` auth, answer in the
//!   first `text` block of `content`

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::EndpointConfig;
use crate::error::{CompetitionError, Result};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Wire dialect of a text-generation endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
    ChatCompletions,
    Messages,
}

impl Dialect {
    pub fn path(&self) -> &'static str {
        match self {
            Dialect::ChatCompletions => "chat/completions",
            Dialect::Messages => "messages",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::ChatCompletions => f.write_str("chat-completions"),
            Dialect::Messages => f.write_str("messages"),
        }
    }
}

/// Anything that turns one user prompt into one text answer
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Identity used in logs and results
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

impl Message {
    fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    messages: Vec<Message>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// HTTP client for one endpoint
pub struct HttpGenerator {
    client: Client,
    name: String,
    model: String,
    dialect: Dialect,
    url: String,
    api_key: String,
    max_tokens: u32,
}

impl HttpGenerator {
    pub fn new(endpoint: &EndpointConfig, max_tokens: u32, timeout_secs: u64) -> Result<Self> {
        let api_key = endpoint.resolve_api_key()?;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| {
                CompetitionError::config(format!("{}: cannot build HTTP client: {}", endpoint.name, e))
            })?;

        let url = format!(
            "{}/{}",
            endpoint.api_base.trim_end_matches('/'),
            endpoint.dialect.path()
        );

        info!(
            "LLM client: name={} model={} dialect={}",
            endpoint.name,
            endpoint.model_id(),
            endpoint.dialect
        );

        Ok(Self {
            client,
            name: endpoint.name.clone(),
            model: endpoint.model_id().to_string(),
            dialect: endpoint.dialect,
            url,
            api_key,
            max_tokens,
        })
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn failure(&self, message: impl Into<String>) -> CompetitionError {
        CompetitionError::call_failed(&self.name, message)
    }

    async fn send(&self, prompt: &str) -> Result<reqwest::Response> {
        let body = GenerateRequest {
            model: &self.model,
            messages: vec![Message::user(prompt)],
            max_tokens: self.max_tokens,
        };

        let request = self.client.post(&self.url).json(&body);
        let request = match self.dialect {
            Dialect::ChatCompletions => {
                request.header("Authorization", format!("Bearer {}", self.api_key))
            }
            Dialect::Messages => request
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION),
        };

        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() {
                self.failure(format!("request timed out: {}", e))
            } else {
                self.failure(format!("request failed: {}", e))
            }
        })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(self.failure(format!("HTTP {}: {}", status, text)));
        }

        Ok(resp)
    }

    fn extract_chat(&self, resp: ChatResponse) -> Result<String> {
        resp.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| self.failure("no content in response"))
    }

    fn extract_messages(&self, resp: MessagesResponse) -> Result<String> {
        resp.content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| self.failure("no text content in response"))
    }
}

#[async_trait]
impl TextGenerator for HttpGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!("Calling {} ({}) at {}", self.name, self.dialect, self.url);

        let resp = self.send(prompt).await?;
        let content = match self.dialect {
            Dialect::ChatCompletions => {
                let parsed: ChatResponse = resp
                    .json()
                    .await
                    .map_err(|e| self.failure(format!("invalid response body: {}", e)))?;
                self.extract_chat(parsed)?
            }
            Dialect::Messages => {
                let parsed: MessagesResponse = resp
                    .json()
                    .await
                    .map_err(|e| self.failure(format!("invalid response body: {}", e)))?;
                self.extract_messages(parsed)?
            }
        };

        debug!("{} answered {} chars", self.name, content.len());
        Ok(content)
    }
}
