//! Pluggable AI backend abstraction
//!
//! This module provides a backend-agnostic interface for the two AI
//! operations the categorizer needs: asking a completion model for a
//! category, and embedding text for semantic matching.
//!
//! # Architecture
//!
//! - `AIBackend` trait: defines the interface for all AI operations
//! - `AIClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `OpenAICompatibleBackend`, `OllamaBackend`, `MockBackend`
//!
//! # Usage
//!
//! ```rust,ignore
//! let config = EngineConfig::load(None)?;
//! if let Some(client) = AIClient::from_config(&config.ai) {
//!     let answered = client.categorize(&transaction).await?;
//!     println!("Raw answer: {:?}", answered.category);
//! }
//! ```

mod mock;
mod ollama;
mod openai_compatible;
pub mod parsing;
pub mod prompts;

pub use mock::MockBackend;
pub use ollama::OllamaBackend;
pub use openai_compatible::OpenAICompatibleBackend;

use async_trait::async_trait;

use crate::config::{AiBackendKind, AiConfig};
use crate::error::Result;
use crate::models::{standard_category_names, Transaction};

/// Trait defining the interface for all AI backends
///
/// Backends must be Send + Sync so strategies can share them across tasks.
#[async_trait]
pub trait AIBackend: Send + Sync {
    /// Ask the model for one of the standard categories
    ///
    /// Returns a copy of the transaction with `category` set to the raw,
    /// uncleaned answer.
    async fn categorize(&self, transaction: &Transaction) -> Result<Transaction> {
        self.categorize_among(transaction, &standard_category_names())
            .await
    }

    /// Ask the model to pick one of `categories`
    async fn categorize_among(
        &self,
        transaction: &Transaction,
        categories: &[String],
    ) -> Result<Transaction>;

    /// Embed a piece of text
    async fn embedding(&self, text: &str) -> Result<Vec<f32>>;

    /// Check if the backend is available
    async fn health_check(&self) -> bool;

    /// Get the model name (for logging)
    fn model(&self) -> &str;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete AI client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Clone)]
pub enum AIClient {
    /// OpenAI-compatible backend (api.openai.com, vLLM, LocalAI, llama-server)
    OpenAICompatible(OpenAICompatibleBackend),
    /// Ollama backend (HTTP API)
    Ollama(OllamaBackend),
    /// Mock backend for testing
    Mock(MockBackend),
}

impl AIClient {
    /// Create an AI client from the `[ai]` config section
    ///
    /// Returns None when the backend is disabled or its required settings
    /// (host, API key) are missing.
    pub fn from_config(config: &AiConfig) -> Option<Self> {
        let client = match config.backend {
            AiBackendKind::OpenAICompatible => {
                OpenAICompatibleBackend::from_config(config).map(AIClient::OpenAICompatible)
            }
            AiBackendKind::Ollama => OllamaBackend::from_config(config).map(AIClient::Ollama),
            AiBackendKind::Mock => Some(AIClient::Mock(MockBackend::new())),
            AiBackendKind::None => None,
        };

        if client.is_none() && config.backend != AiBackendKind::None {
            tracing::info!(
                backend = %config.backend,
                "AI backend not configured (missing host or API key)"
            );
        }
        client
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        AIClient::Mock(MockBackend::new())
    }
}

impl From<MockBackend> for AIClient {
    fn from(backend: MockBackend) -> Self {
        AIClient::Mock(backend)
    }
}

// Implement AIBackend for AIClient by delegating to the inner backend
#[async_trait]
impl AIBackend for AIClient {
    async fn categorize_among(
        &self,
        transaction: &Transaction,
        categories: &[String],
    ) -> Result<Transaction> {
        match self {
            AIClient::OpenAICompatible(b) => b.categorize_among(transaction, categories).await,
            AIClient::Ollama(b) => b.categorize_among(transaction, categories).await,
            AIClient::Mock(b) => b.categorize_among(transaction, categories).await,
        }
    }

    async fn embedding(&self, text: &str) -> Result<Vec<f32>> {
        match self {
            AIClient::OpenAICompatible(b) => b.embedding(text).await,
            AIClient::Ollama(b) => b.embedding(text).await,
            AIClient::Mock(b) => b.embedding(text).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            AIClient::OpenAICompatible(b) => b.health_check().await,
            AIClient::Ollama(b) => b.health_check().await,
            AIClient::Mock(b) => b.health_check().await,
        }
    }

    fn model(&self) -> &str {
        match self {
            AIClient::OpenAICompatible(b) => b.model(),
            AIClient::Ollama(b) => b.model(),
            AIClient::Mock(b) => b.model(),
        }
    }

    fn host(&self) -> &str {
        match self {
            AIClient::OpenAICompatible(b) => b.host(),
            AIClient::Ollama(b) => b.host(),
            AIClient::Mock(b) => b.host(),
        }
    }
}
