//! OpenAI-compatible backend implementation
//!
//! Works with any server that implements the OpenAI chat completions and
//! embeddings APIs:
//! - api.openai.com
//! - vLLM (http://localhost:8000)
//! - LocalAI (http://localhost:8080)
//! - llama-server / llama.cpp (http://localhost:8080)
//!
//! # Configuration
//!
//! `[ai]` section of tally.toml plus `TALLY_AI_API_KEY` / `OPENAI_API_KEY`.
//! Without an API key the backend is not created and the AI strategy stays
//! disabled.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AiConfig;
use crate::error::{Error, Result};
use crate::models::Transaction;

use super::prompts::categorization_prompt;
use super::AIBackend;

/// OpenAI-compatible backend
///
/// Uses `/v1/chat/completions` for categorization and `/v1/embeddings` for
/// semantic matching.
#[derive(Clone)]
pub struct OpenAICompatibleBackend {
    http_client: Client,
    base_url: String,
    model: String,
    embedding_model: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl OpenAICompatibleBackend {
    /// Create a new OpenAI-compatible backend
    pub fn new(base_url: &str, model: &str, embedding_model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            embedding_model: embedding_model.to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Create with an API key
    pub fn with_api_key(base_url: &str, model: &str, embedding_model: &str, api_key: &str) -> Self {
        let mut backend = Self::new(base_url, model, embedding_model);
        backend.api_key = Some(api_key.to_string());
        backend
    }

    /// Set the per-request HTTP timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create from engine config
    ///
    /// Returns None when no API key or host is configured.
    pub fn from_config(config: &AiConfig) -> Option<Self> {
        let host = config.host.as_deref()?;
        let api_key = config.api_key.as_deref()?;
        Some(
            Self::with_api_key(host, &config.model, &config.embedding_model, api_key)
                .with_timeout(config.timeout),
        )
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let mut req_builder = self
            .http_client
            .post(format!("{}{}", self.base_url, path))
            .timeout(self.timeout);

        if let Some(ref api_key) = self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }
        req_builder
    }

    /// Make a chat completion request
    async fn chat_completion(&self, prompt: &str) -> Result<String> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: Some(0.1),
            max_tokens: Some(20),
            stream: false,
        };

        let response = self
            .post("/v1/chat/completions")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Ai(format!("OpenAI API error {}: {}", status, body)));
        }

        let chat_response: ChatCompletionResponse = response.json().await?;

        chat_response
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Ai("No response from OpenAI API".into()))
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

/// Chat message
#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// OpenAI chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

/// Chat completion choice
#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

/// Chat response message
#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// Embeddings request
#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    input: String,
}

/// Embeddings response
#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[async_trait]
impl AIBackend for OpenAICompatibleBackend {
    async fn categorize_among(
        &self,
        transaction: &Transaction,
        categories: &[String],
    ) -> Result<Transaction> {
        let prompt = categorization_prompt(transaction, categories);

        let response = self.chat_completion(&prompt).await?;
        debug!(party = %transaction.party_name, "OpenAI-compatible response: {}", response);

        let mut categorized = transaction.clone();
        categorized.category = Some(response.trim().to_string());
        Ok(categorized)
    }

    async fn embedding(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: self.embedding_model.clone(),
            input: text.to_string(),
        };

        let response = self.post("/v1/embeddings").json(&request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Ai(format!(
                "OpenAI embedding API error {}: {}",
                status, body
            )));
        }

        let embedding_response: EmbeddingResponse = response.json().await?;

        embedding_response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| Error::Ai("Empty embedding from OpenAI API".into()))
    }

    async fn health_check(&self) -> bool {
        let mut req_builder = self
            .http_client
            .get(format!("{}/v1/models", self.base_url))
            .timeout(self.timeout);
        if let Some(ref api_key) = self.api_key {
            req_builder = req_builder.header("Authorization", format!("Bearer {}", api_key));
        }

        match req_builder.send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}
