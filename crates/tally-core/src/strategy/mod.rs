//! Categorization strategies
//!
//! Each strategy answers one question: "do you know the category of this
//! transaction?". The [`Categorizer`](crate::Categorizer) runs them in a fixed
//! order and stops at the first match:
//!
//! 1. [`DirectMappingStrategy`]: learned/configured party → category tables
//! 2. [`KeywordStrategy`]: configured and built-in keyword tables
//! 3. [`SemanticStrategy`]: embedding similarity against category descriptions
//! 4. [`AIStrategy`]: completion model fallback
//!
//! Strategies return `Ok(None)` for "no match". `Err` is reserved for local
//! failures (poisoned locks); network trouble in the AI-backed strategies is
//! logged and reported as no match.

mod ai;
mod direct;
mod keyword;
mod rate_limit;
mod semantic;

pub use ai::{AIStrategy, Readiness};
pub use direct::DirectMappingStrategy;
pub use keyword::KeywordStrategy;
pub use rate_limit::RateLimiter;
pub use semantic::{cosine_similarity, SemanticStrategy, SIMILARITY_THRESHOLD};

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Category, StrategyKind, StrategyResult, Transaction};

/// One approach to categorizing a transaction
#[async_trait]
pub trait CategorizationStrategy: Send + Sync {
    /// Category for the transaction, or None when this strategy has no answer
    async fn categorize(&self, transaction: &Transaction) -> Result<Option<Category>>;

    /// Position of this strategy in the chain
    fn kind(&self) -> StrategyKind;

    /// Name used in logs
    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Confidence reported with a match (informational only)
    fn confidence(&self) -> f64;

    /// Run the strategy and wrap the outcome for diagnostics
    async fn evaluate(&self, transaction: &Transaction) -> StrategyResult {
        match self.categorize(transaction).await {
            Ok(Some(category)) => StrategyResult::matched(self.kind(), category, self.confidence()),
            Ok(None) => StrategyResult::not_found(self.kind()),
            Err(e) => StrategyResult::failed(self.kind(), e),
        }
    }
}
