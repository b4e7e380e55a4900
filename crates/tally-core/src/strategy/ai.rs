//! Completion-model fallback strategy

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::ai::parsing::clean_category_response;
use crate::ai::{AIBackend, AIClient};
use crate::error::{Error, Result};
use crate::models::{
    standard_category_names, Category, CategoryConfig, StrategyKind, Transaction,
};

use super::{CategorizationStrategy, RateLimiter};

/// Whether the strategy will contact a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// No client configured; every call is a no-op
    Disabled,
    /// Calls go to the configured backend
    Active,
}

/// Asks a completion model for one of the known categories
///
/// The offered list is the standard taxonomy followed by any configured
/// category it does not already contain.
pub struct AIStrategy {
    client: Option<AIClient>,
    limiter: Arc<RateLimiter>,
    timeout: Duration,
    categories: RwLock<Arc<Vec<String>>>,
}

impl AIStrategy {
    pub fn new(client: Option<AIClient>, limiter: Arc<RateLimiter>, timeout: Duration) -> Self {
        Self {
            client,
            limiter,
            timeout,
            categories: RwLock::new(Arc::new(standard_category_names())),
        }
    }

    /// Also offer the configured categories
    pub fn with_categories(self, configured: &[CategoryConfig]) -> Self {
        Self {
            categories: RwLock::new(Arc::new(offered_names(configured))),
            ..self
        }
    }

    /// Replace the configured part of the offered list
    pub fn reload_categories(&self, configured: &[CategoryConfig]) -> Result<()> {
        let names = Arc::new(offered_names(configured));
        let mut current = self
            .categories
            .write()
            .map_err(|_| Error::Lock("AI categories".into()))?;
        *current = names;
        Ok(())
    }

    /// Category names offered to the model
    pub fn categories(&self) -> Result<Arc<Vec<String>>> {
        self.categories
            .read()
            .map(|c| Arc::clone(&c))
            .map_err(|_| Error::Lock("AI categories".into()))
    }

    pub fn readiness(&self) -> Readiness {
        if self.client.is_some() {
            Readiness::Active
        } else {
            Readiness::Disabled
        }
    }

    /// Resolved category name for the transaction
    pub async fn suggest(&self, transaction: &Transaction) -> Option<String> {
        let client = self.client.as_ref()?;
        if !transaction.has_party() {
            return None;
        }

        let categories = match self.categories() {
            Ok(categories) => categories,
            Err(e) => {
                warn!(error = %e, "AI category list unavailable");
                return None;
            }
        };

        self.limiter.acquire().await;

        let call = client.categorize_among(transaction, &categories);
        let answered = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(answered)) => answered,
            Ok(Err(e)) => {
                warn!(party = %transaction.party_name, model = client.model(), error = %e, "AI categorization failed");
                return None;
            }
            Err(_) => {
                warn!(party = %transaction.party_name, timeout = ?self.timeout, "AI categorization timed out");
                return None;
            }
        };

        let raw = answered.category.unwrap_or_default();
        match clean_category_response(&raw, &categories) {
            Some(name) => {
                debug!(party = %transaction.party_name, raw = %raw.trim(), category = %name, "AI categorization");
                Some(name)
            }
            None => {
                debug!(party = %transaction.party_name, raw = %raw.trim(), "AI answer carried no category");
                None
            }
        }
    }
}

fn offered_names(configured: &[CategoryConfig]) -> Vec<String> {
    let mut names = standard_category_names();
    for category in configured {
        let name = category.name.trim();
        if !name.is_empty() && !names.iter().any(|n| n.eq_ignore_ascii_case(name)) {
            names.push(name.to_string());
        }
    }
    names
}

#[async_trait]
impl CategorizationStrategy for AIStrategy {
    async fn categorize(&self, transaction: &Transaction) -> Result<Option<Category>> {
        Ok(self.suggest(transaction).await.map(Category::new))
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Ai
    }

    fn confidence(&self) -> f64 {
        0.7
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::MockBackend;

    fn strategy(backend: &MockBackend) -> AIStrategy {
        AIStrategy::new(
            Some(backend.clone().into()),
            Arc::new(RateLimiter::unlimited()),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn test_labelled_answer_is_cleaned() {
        let backend = MockBackend::new().with_category_response("Category: Shopping");
        let s = strategy(&backend);

        let category = s
            .categorize(&Transaction::new("Obscure Web Shop", true))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(category.name, "Shopping");
        assert_eq!(category.description, "Retail purchases, clothing and online stores");
    }

    #[tokio::test]
    async fn test_disabled_does_nothing() {
        let s = AIStrategy::new(None, Arc::new(RateLimiter::unlimited()), Duration::from_secs(1));
        assert_eq!(s.readiness(), Readiness::Disabled);
        assert!(s
            .categorize(&Transaction::new("Anything", false))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_empty_party_skips_client() {
        let backend = MockBackend::new().with_category_response("Groceries");
        let s = strategy(&backend);
        assert_eq!(s.readiness(), Readiness::Active);

        assert!(s.suggest(&Transaction::new(" ", false)).await.is_none());
        assert_eq!(backend.categorize_calls(), 0);
    }

    #[tokio::test]
    async fn test_backend_error_is_not_found() {
        let backend = MockBackend::new().failing();
        let s = strategy(&backend);
        assert!(s
            .categorize(&Transaction::new("Coop", false))
            .await
            .unwrap()
            .is_none());
        assert_eq!(backend.categorize_calls(), 1);
    }

    #[tokio::test]
    async fn test_timeout_is_not_found() {
        let backend = MockBackend::new()
            .with_category_response("Groceries")
            .with_delay(Duration::from_millis(500));
        let s = AIStrategy::new(
            Some(backend.into()),
            Arc::new(RateLimiter::unlimited()),
            Duration::from_millis(50),
        );
        assert!(s.suggest(&Transaction::new("Coop", false)).await.is_none());
    }

    #[tokio::test]
    async fn test_junk_answer_is_not_found() {
        let backend = MockBackend::new().with_category_response("Unknown");
        let s = strategy(&backend);
        assert!(s.suggest(&Transaction::new("Mystery", false)).await.is_none());
    }

    #[tokio::test]
    async fn test_configured_categories_are_offered() {
        let backend = MockBackend::new().with_category_response("childcare");
        let s = strategy(&backend).with_categories(&[
            CategoryConfig::new("Childcare", &["KITA"]),
            CategoryConfig::new("groceries", &["VOLG"]),
        ]);

        let category = s
            .categorize(&Transaction::new("Kinderkrippe Sonnenschein", true))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(category.name, "Childcare");

        let offered = backend.offered_categories();
        assert!(offered.contains(&"Childcare".to_string()));
        assert!(offered.contains(&"Groceries".to_string()));
        assert!(!offered.contains(&"groceries".to_string()));
    }

    #[tokio::test]
    async fn test_reload_categories_replaces_configured_names() {
        let backend = MockBackend::new().with_category_response("Groceries");
        let s = strategy(&backend).with_categories(&[CategoryConfig::new("Childcare", &["KITA"])]);

        s.reload_categories(&[CategoryConfig::new("Pets", &["FRESSNAPF"])])
            .unwrap();
        let names = s.categories().unwrap();
        assert!(names.contains(&"Pets".to_string()));
        assert!(!names.contains(&"Childcare".to_string()));
        assert_eq!(names.len(), standard_category_names().len() + 1);
    }

    #[tokio::test]
    async fn test_shared_limiter_spaces_calls() {
        let backend = MockBackend::new().with_category_response("Groceries");
        let limiter = Arc::new(RateLimiter::new(1200));
        let first = AIStrategy::new(Some(backend.clone().into()), Arc::clone(&limiter), Duration::from_secs(1));
        let second = AIStrategy::new(Some(backend.clone().into()), limiter, Duration::from_secs(1));

        let start = tokio::time::Instant::now();
        first.suggest(&Transaction::new("A", false)).await;
        second.suggest(&Transaction::new("B", false)).await;
        first.suggest(&Transaction::new("C", false)).await;

        assert!(start.elapsed() >= Duration::from_millis(100));
        assert_eq!(backend.categorize_calls(), 3);
    }
}
