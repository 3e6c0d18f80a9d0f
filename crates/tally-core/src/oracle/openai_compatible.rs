//! OpenAI-compatible oracle backend
//!
//! Works with any server that implements the OpenAI chat completions API
//! (Groq, vLLM, LocalAI, llama-server, Docker Model Runner).

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

use super::parsing::parse_category_response;
use super::{category_prompt, CategoryOracle};

const DEFAULT_MODEL: &str = "openai/gpt-oss-20b";

/// Oracle backed by a `/v1/chat/completions` endpoint
#[derive(Clone)]
pub struct OpenAICompatibleOracle {
    http_client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl OpenAICompatibleOracle {
    /// Create a new oracle client
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: None,
        }
    }

    /// Create with an API key
    pub fn with_api_key(base_url: &str, model: &str, api_key: &str) -> Self {
        Self {
            api_key: Some(api_key.to_string()),
            ..Self::new(base_url, model)
        }
    }

    /// Create from environment variables
    ///
    /// Required: `TALLY_ORACLE_HOST`
    /// Optional: `TALLY_ORACLE_MODEL`, `TALLY_ORACLE_API_KEY`
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("TALLY_ORACLE_HOST").ok()?;
        let model =
            std::env::var("TALLY_ORACLE_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let mut oracle = Self::new(&host, &model);
        oracle.api_key = std::env::var("TALLY_ORACLE_API_KEY").ok();
        Some(oracle)
    }

    async fn chat_completion(&self, prompt: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: Some(0.0),
            max_tokens: Some(64),
            stream: false,
        };

        let mut req_builder = self
            .http_client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&request);

        if let Some(ref api_key) = self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        let response = req_builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Oracle(format!("oracle API error {}: {}", status, body)));
        }

        let chat_response: ChatCompletionResponse = response.json().await?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Oracle("No response from oracle API".into()))
    }
}

#[async_trait]
impl CategoryOracle for OpenAICompatibleOracle {
    async fn suggest_category(
        &self,
        description: &str,
        amount_cents: i64,
        allowed: &[String],
    ) -> Result<Option<String>> {
        let prompt = category_prompt(description, amount_cents, allowed);
        let content = self.chat_completion(&prompt).await?;
        debug!(model = %self.model, response = %content, "Oracle response");

        if content.trim().is_empty() {
            return Ok(None);
        }
        parse_category_response(&content).map(Some)
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}

/// OpenAI chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}
