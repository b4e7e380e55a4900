//! Ollama backend implementation
//!
//! HTTP client for a local Ollama server. No API key is involved; the backend
//! is active whenever a host is configured.

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

/// Ollama backend
#[derive(Clone)]
pub struct OllamaBackend {
    http_client: Client,
    base_url: String,
    model: String,
    embedding_model: String,
    timeout: Duration,
}

impl OllamaBackend {
    /// Create a new Ollama backend
    pub fn new(base_url: &str, model: &str, embedding_model: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            embedding_model: embedding_model.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the per-request HTTP timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Create from engine config (None without a host)
    pub fn from_config(config: &AiConfig) -> Option<Self> {
        let host = config.host.as_deref()?;
        Some(Self::new(host, &config.model, &config.embedding_model).with_timeout(config.timeout))
    }
}

/// Request to Ollama generate API
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    prompt: String,
    stream: bool,
}

/// Response from Ollama generate API
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

/// Request to Ollama embeddings API
#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest {
    model: String,
    prompt: String,
}

/// Response from Ollama embeddings API
#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

#[async_trait]
impl AIBackend for OllamaBackend {
    async fn categorize_among(
        &self,
        transaction: &Transaction,
        categories: &[String],
    ) -> Result<Transaction> {
        let request = OllamaRequest {
            model: self.model.clone(),
            prompt: categorization_prompt(transaction, categories),
            stream: false,
        };

        let response = self
            .http_client
            .post(format!("{}/api/generate", self.base_url))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let ollama_response: OllamaResponse = response.json().await?;
        debug!(party = %transaction.party_name, "Ollama response: {}", ollama_response.response);

        let mut categorized = transaction.clone();
        categorized.category = Some(ollama_response.response.trim().to_string());
        Ok(categorized)
    }

    async fn embedding(&self, text: &str) -> Result<Vec<f32>> {
        let request = OllamaEmbeddingRequest {
            model: self.embedding_model.clone(),
            prompt: text.to_string(),
        };

        let response = self
            .http_client
            .post(format!("{}/api/embeddings", self.base_url))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        let embedding: OllamaEmbeddingResponse = response.json().await?;
        if embedding.embedding.is_empty() {
            return Err(Error::Ai("Empty embedding from Ollama".into()));
        }
        Ok(embedding.embedding)
    }

    async fn health_check(&self) -> bool {
        match self
            .http_client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(self.timeout)
            .send()
            .await
        {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockAiServer;

    #[test]
    fn test_from_config_needs_host() {
        let mut config = AiConfig {
            host: None,
            ..Default::default()
        };
        assert!(OllamaBackend::from_config(&config).is_none());

        config.host = Some("http://localhost:11434/".to_string());
        let backend = OllamaBackend::from_config(&config).unwrap();
        assert_eq!(backend.host(), "http://localhost:11434");
    }

    #[tokio::test]
    async fn test_generate_and_embed_against_mock_server() {
        let server = MockAiServer::start().await;
        let backend = OllamaBackend::new(&server.url(), "llama3.2", "nomic-embed-text");

        let tx = Transaction::new("Netflix.com", false);
        let result = backend.categorize(&tx).await.unwrap();
        assert_eq!(result.category.as_deref(), Some("Subscriptions"));

        let vector = backend.embedding("Subscriptions: NETFLIX").await.unwrap();
        assert!(!vector.is_empty());
        assert!(backend.health_check().await);
    }
}
