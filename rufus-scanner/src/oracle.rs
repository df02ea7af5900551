//! Text-in, text-out access to the semantic classification model.

use crate::error::{OracleError, SetupError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Which classification a prompt is for. Each task may use its own model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    ExpandKeywords,
    PageRelevance,
    LinkFollow,
}

impl Task {
    pub fn as_str(&self) -> &'static str {
        match self {
            Task::ExpandKeywords => "expand_keywords",
            Task::PageRelevance => "page_relevance",
            Task::LinkFollow => "link_follow",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Prompt {
    pub task: Task,
    pub system: String,
    pub user: String,
}

/// The external model. Returns the raw completion text.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn complete(&self, prompt: &Prompt) -> Result<String, OracleError>;
}

#[derive(Debug, Clone)]
pub struct OracleConfig {
    pub api_key: String,
    pub base_url: String,
    pub keyword_model: String,
    pub relevance_model: String,
    pub link_model: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl OracleConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            keyword_model: "o1-mini".to_string(),
            relevance_model: "gpt-4o".to_string(),
            link_model: "gpt-4".to_string(),
            temperature: 0.3,
            timeout: Duration::from_secs(60),
        }
    }

    /// Reads `OPENAI_API_KEY` (required), `OPENAI_BASE_URL`,
    /// `RUFUS_KEYWORD_MODEL`, `RUFUS_RELEVANCE_MODEL`, `RUFUS_LINK_MODEL` and
    /// `RUFUS_ORACLE_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, SetupError> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| SetupError::Config("OPENAI_API_KEY not set".into()))?;
        let mut config = Self::new(api_key);

        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            config.base_url = url;
        }
        if let Ok(model) = std::env::var("RUFUS_KEYWORD_MODEL") {
            config.keyword_model = model;
        }
        if let Ok(model) = std::env::var("RUFUS_RELEVANCE_MODEL") {
            config.relevance_model = model;
        }
        if let Ok(model) = std::env::var("RUFUS_LINK_MODEL") {
            config.link_model = model;
        }
        if let Ok(secs) = std::env::var("RUFUS_ORACLE_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().map_err(|_| {
                SetupError::Config(format!("RUFUS_ORACLE_TIMEOUT_SECS is not a number: {}", secs))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn model_for(&self, task: Task) -> &str {
        match task {
            Task::ExpandKeywords => &self.keyword_model,
            Task::PageRelevance => &self.relevance_model,
            Task::LinkFollow => &self.link_model,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponseRaw {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

/// Oracle backed by an OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct ChatOracle {
    http_client: Client,
    config: OracleConfig,
}

impl ChatOracle {
    pub fn new(config: OracleConfig) -> Result<Self, SetupError> {
        let http_client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn from_env() -> Result<Self, SetupError> {
        Self::new(OracleConfig::from_env()?)
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }
}

#[async_trait]
impl Oracle for ChatOracle {
    async fn complete(&self, prompt: &Prompt) -> Result<String, OracleError> {
        let start = Instant::now();
        let model = self.config.model_for(prompt.task);
        let request = ChatRequest {
            model,
            messages: vec![
                Message {
                    role: "system",
                    content: &prompt.system,
                },
                Message {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: self.config.temperature,
        };

        let response = self
            .http_client
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OracleError::Timeout(self.config.timeout)
                } else {
                    OracleError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(
                status = %status,
                error = %error_text,
                task = prompt.task.as_str(),
                "Oracle API error"
            );
            return Err(OracleError::Api(format!("{}: {}", status, error_text)));
        }

        let raw: ChatResponseRaw = response
            .json()
            .await
            .map_err(|e| OracleError::Malformed(e.to_string()))?;

        let content = raw
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| OracleError::Malformed("no completion returned".into()))?;

        debug!(
            model = %model,
            task = prompt.task.as_str(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Oracle completion"
        );
        Ok(content)
    }
}
