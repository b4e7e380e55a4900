//! Tally Core Library
//!
//! Transaction categorization engine for bank statement conversion:
//! - Strategy chain (direct mapping, keywords, embeddings, AI fallback)
//! - Orchestrator with auto-learning of party → category mappings
//! - Pluggable AI backends (OpenAI-compatible, Ollama, mock)
//! - YAML category and mapping store
//! - Layered configuration (embedded defaults, override file, environment)

pub mod ai;
pub mod categorizer;
pub mod config;
pub mod error;
pub mod models;
pub mod store;
pub mod strategy;

/// Test utilities including a mock AI provider server
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use ai::{AIBackend, AIClient, MockBackend, OllamaBackend, OpenAICompatibleBackend};
pub use categorizer::{categorize_transaction, Categorizer};
pub use config::{AiBackendKind, AiConfig, EngineConfig, StrategyToggles};
pub use error::{Error, Result};
pub use models::{
    best_result, Category, CategoryConfig, StrategyKind, StrategyResult, Transaction,
    STANDARD_CATEGORIES, UNCATEGORIZED,
};
pub use store::{CategoryStore, MemoryCategoryStore, YamlCategoryStore};
pub use strategy::{
    AIStrategy, CategorizationStrategy, DirectMappingStrategy, KeywordStrategy, RateLimiter,
    Readiness, SemanticStrategy,
};
