//! Categorization orchestrator
//!
//! The [`Categorizer`] owns the strategy chain and runs it in priority order:
//! direct mapping, keywords, semantic similarity, AI. The first strategy that
//! answers wins. Keyword and AI answers are written back into the direct
//! mapping tables and saved right away, so the next transaction from the same
//! party is resolved locally.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::ai::AIClient;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::models::{Category, CategoryConfig, StrategyResult, Transaction};
use crate::store::CategoryStore;
use crate::strategy::{
    AIStrategy, CategorizationStrategy, DirectMappingStrategy, KeywordStrategy, RateLimiter,
    Readiness, SemanticStrategy,
};

/// Multi-strategy transaction categorizer
///
/// `Send + Sync`; share it across tasks with `Arc`.
pub struct Categorizer {
    store: Arc<dyn CategoryStore>,
    direct: Arc<DirectMappingStrategy>,
    keyword: Arc<KeywordStrategy>,
    semantic: Option<Arc<SemanticStrategy>>,
    ai: Option<Arc<AIStrategy>>,
    strategies: Vec<Arc<dyn CategorizationStrategy>>,
}

impl Categorizer {
    /// Build the strategy chain
    ///
    /// Categories and mappings are loaded from `store`; load failures are
    /// logged and leave the affected table empty.
    pub fn new(store: Arc<dyn CategoryStore>, ai_client: Option<AIClient>, config: &EngineConfig) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.ai.requests_per_minute));
        Self::with_rate_limiter(store, ai_client, config, limiter)
    }

    /// Build the strategy chain with an existing rate limiter
    ///
    /// Categorizers sharing a limiter share the AI call budget.
    pub fn with_rate_limiter(
        store: Arc<dyn CategoryStore>,
        ai_client: Option<AIClient>,
        config: &EngineConfig,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        let categories = store.load_categories().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load categories, starting without keyword categories");
            Vec::new()
        });

        let direct = Arc::new(DirectMappingStrategy::new(store.as_ref()));
        let keyword = Arc::new(KeywordStrategy::new(categories.clone()));

        let mut strategies: Vec<Arc<dyn CategorizationStrategy>> =
            vec![direct.clone(), keyword.clone()];

        let semantic = if config.strategies.semantic {
            let semantic = Arc::new(SemanticStrategy::new(
                ai_client.clone(),
                categories.clone(),
                config.ai.embedding_timeout,
            ));
            strategies.push(semantic.clone());
            Some(semantic)
        } else {
            None
        };

        let ai = if config.strategies.ai {
            let ai = Arc::new(
                AIStrategy::new(ai_client, limiter, config.ai.timeout).with_categories(&categories),
            );
            strategies.push(ai.clone());
            Some(ai)
        } else {
            None
        };

        info!(
            strategies = ?strategies.iter().map(|s| s.name()).collect::<Vec<_>>(),
            ai = ?ai.as_ref().map(|a| a.readiness()),
            "Categorizer ready"
        );

        Self {
            store,
            direct,
            keyword,
            semantic,
            ai,
            strategies,
        }
    }

    /// Categorize one transaction
    ///
    /// Never fails: no match (or an empty party name) yields `Uncategorized`.
    pub async fn categorize(&self, transaction: &Transaction) -> Result<Category> {
        if !transaction.has_party() {
            debug!("Empty party name, skipping strategies");
            return Ok(Category::uncategorized());
        }

        for strategy in &self.strategies {
            match strategy.categorize(transaction).await {
                Ok(Some(category)) if !category.name.trim().is_empty() => {
                    debug!(
                        strategy = strategy.name(),
                        party = %transaction.party_name,
                        category = %category.name,
                        "Transaction categorized"
                    );
                    if strategy.kind().is_learnable() && !category.is_uncategorized() {
                        self.learn(transaction, &category);
                    }
                    return Ok(category);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        strategy = strategy.name(),
                        party = %transaction.party_name,
                        error = %e,
                        "Strategy failed, trying next"
                    );
                }
            }
        }

        debug!(party = %transaction.party_name, "No strategy matched");
        Ok(Category::uncategorized())
    }

    /// Categorize a statement, in order
    pub async fn categorize_batch(&self, transactions: &[Transaction]) -> Vec<Category> {
        let mut categories = Vec::with_capacity(transactions.len());
        for transaction in transactions {
            let category = self.categorize(transaction).await.unwrap_or_else(|e| {
                warn!(party = %transaction.party_name, error = %e, "Categorization failed");
                Category::uncategorized()
            });
            categories.push(category);
        }
        categories
    }

    /// Run every strategy without short-circuiting or learning
    pub async fn evaluate_all(&self, transaction: &Transaction) -> Vec<StrategyResult> {
        let mut results = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            let result = if transaction.has_party() {
                strategy.evaluate(transaction).await
            } else {
                StrategyResult::not_found(strategy.kind())
            };
            results.push(result);
        }
        results
    }

    /// Record a learned mapping and save its table
    fn learn(&self, transaction: &Transaction, category: &Category) {
        if let Err(e) = self.direct.update(&transaction.party_name, &category.name, transaction.is_debtor) {
            warn!(party = %transaction.party_name, error = %e, "Failed to record learned mapping");
            return;
        }

        match self.direct.persist(self.store.as_ref(), transaction.is_debtor) {
            Ok(()) => info!(
                party = %transaction.party_name,
                category = %category.name,
                debtor = transaction.is_debtor,
                "Learned mapping"
            ),
            Err(e) => warn!(
                party = %transaction.party_name,
                error = %e,
                "Failed to save learned mapping"
            ),
        }
    }

    pub fn update_creditor_mapping(&self, party_name: &str, category: &str) -> Result<()> {
        self.direct.update_creditor_mapping(party_name, category)
    }

    pub fn update_debtor_mapping(&self, party_name: &str, category: &str) -> Result<()> {
        self.direct.update_debtor_mapping(party_name, category)
    }

    /// Save mapping tables with unsaved changes
    pub fn save_mappings(&self) -> Result<()> {
        self.direct.save_dirty(self.store.as_ref())
    }

    /// Re-read both mapping tables from the store
    pub fn reload_mappings(&self) -> Result<()> {
        self.direct.reload(self.store.as_ref())
    }

    /// Re-read categories from the store into the keyword, semantic and AI strategies
    pub fn reload_categories(&self) -> Result<()> {
        let categories = self.store.load_categories()?;
        info!(count = categories.len(), "Reloading categories");

        self.keyword.reload_categories(categories.clone())?;
        if let Some(ref ai) = self.ai {
            ai.reload_categories(&categories)?;
        }
        if let Some(ref semantic) = self.semantic {
            semantic.reload_categories(categories);
        }
        Ok(())
    }

    pub fn creditor_mappings(&self) -> Result<HashMap<String, String>> {
        self.direct.creditor_mappings()
    }

    pub fn debtor_mappings(&self) -> Result<HashMap<String, String>> {
        self.direct.debtor_mappings()
    }

    /// Configured keyword categories
    pub fn categories(&self) -> Result<Arc<Vec<CategoryConfig>>> {
        self.keyword.categories()
    }

    /// AI strategy state, None when the strategy is switched off
    pub fn ai_readiness(&self) -> Option<Readiness> {
        self.ai.as_ref().map(|ai| ai.readiness())
    }

    /// Wait for the semantic warm-up to finish
    pub async fn wait_until_ready(&self) {
        if let Some(ref semantic) = self.semantic {
            semantic.wait_until_ready().await;
        }
    }

    /// Stop background work
    pub fn shutdown(&self) {
        if let Some(ref semantic) = self.semantic {
            semantic.shutdown();
        }
    }

    #[cfg(test)]
    fn insert_strategy(&mut self, index: usize, strategy: Arc<dyn CategorizationStrategy>) {
        self.strategies.insert(index, strategy);
    }
}

/// Categorize with an optional categorizer
///
/// Returns [`Error::NotInitialized`] when no categorizer has been built.
pub async fn categorize_transaction(
    categorizer: Option<&Categorizer>,
    transaction: &Transaction,
) -> Result<Category> {
    match categorizer {
        Some(categorizer) => categorizer.categorize(transaction).await,
        None => Err(Error::NotInitialized),
    }
}
