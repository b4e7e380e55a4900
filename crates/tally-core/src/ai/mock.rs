//! Mock backend for testing
//!
//! Provides configurable mock responses for categorization and embeddings.
//! Useful for unit tests and development without a provider account.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::models::Transaction;

use super::AIBackend;

/// Mock AI backend for testing
///
/// Returns predictable responses for all AI operations. Clones share call
/// counters, so a test can keep one handle and give another to the engine.
#[derive(Clone)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    category_response: Option<String>,
    embeddings: Arc<HashMap<String, Vec<f32>>>,
    fail: bool,
    delay: Option<Duration>,
    categorize_calls: Arc<AtomicUsize>,
    embedding_calls: Arc<AtomicUsize>,
    offered: Arc<Mutex<Vec<String>>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            healthy: true,
            category_response: None,
            embeddings: Arc::new(HashMap::new()),
            fail: false,
            delay: None,
            categorize_calls: Arc::new(AtomicUsize::new(0)),
            embedding_calls: Arc::new(AtomicUsize::new(0)),
            offered: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Always answer categorization calls with this raw text
    pub fn with_category_response(mut self, response: &str) -> Self {
        self.category_response = Some(response.to_string());
        self
    }

    /// Return this vector when asked to embed exactly `text`
    pub fn with_embedding(mut self, text: &str, vector: Vec<f32>) -> Self {
        Arc::make_mut(&mut self.embeddings).insert(text.to_string(), vector);
        self
    }

    /// Make every call fail with an AI error
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Sleep before answering (for timeout tests)
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of categorize calls received
    pub fn categorize_calls(&self) -> usize {
        self.categorize_calls.load(Ordering::SeqCst)
    }

    /// Number of embedding calls received
    pub fn embedding_calls(&self) -> usize {
        self.embedding_calls.load(Ordering::SeqCst)
    }

    /// Category list passed with the most recent categorize call
    pub fn offered_categories(&self) -> Vec<String> {
        self.offered.lock().map(|o| o.clone()).unwrap_or_default()
    }

    async fn simulate_latency(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    /// Heuristic answer for well-known merchants when nothing is scripted
    fn guess(party: &str) -> &'static str {
        match party.to_uppercase().as_str() {
            p if p.contains("NETFLIX") || p.contains("SPOTIFY") => "Subscriptions",
            p if p.contains("GALAXUS") || p.contains("ZALANDO") || p.contains("AMAZON") => {
                "Shopping"
            }
            p if p.contains("STARBUCKS") => "Restaurants",
            p if p.contains("UBER") => "Transportation",
            p if p.contains("HELSANA") || p.contains("CSS") => "Insurance",
            _ => "Unknown",
        }
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn categorize_among(
        &self,
        transaction: &Transaction,
        categories: &[String],
    ) -> Result<Transaction> {
        self.categorize_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut offered) = self.offered.lock() {
            *offered = categories.to_vec();
        }
        self.simulate_latency().await;

        if self.fail {
            return Err(Error::Ai("mock categorization failure".into()));
        }

        let answer = self
            .category_response
            .clone()
            .unwrap_or_else(|| Self::guess(&transaction.party_name).to_string());

        let mut categorized = transaction.clone();
        categorized.category = Some(answer);
        Ok(categorized)
    }

    async fn embedding(&self, text: &str) -> Result<Vec<f32>> {
        self.embedding_calls.fetch_add(1, Ordering::SeqCst);
        self.simulate_latency().await;

        if self.fail {
            return Err(Error::Ai("mock embedding failure".into()));
        }

        self.embeddings
            .get(text)
            .cloned()
            .ok_or_else(|| Error::Ai(format!("no mock embedding for '{}'", text)))
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        "mock"
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_scripted_category() {
        let mock = MockBackend::new().with_category_response("Category: Shopping");
        let tx = Transaction::new("Anything", false);

        let result = mock.categorize(&tx).await.unwrap();
        assert_eq!(result.category.as_deref(), Some("Category: Shopping"));
        assert_eq!(result.party_name, "Anything");
        assert!(tx.category.is_none());
    }

    #[tokio::test]
    async fn test_mock_guess_category() {
        let mock = MockBackend::new();
        let result = mock
            .categorize(&Transaction::new("NETFLIX.COM", false))
            .await
            .unwrap();
        assert_eq!(result.category.as_deref(), Some("Subscriptions"));
    }

    #[tokio::test]
    async fn test_mock_records_offered_categories() {
        let mock = MockBackend::new().with_category_response("Childcare");
        mock.categorize(&Transaction::new("Kita", false)).await.unwrap();
        assert!(mock.offered_categories().contains(&"Groceries".to_string()));

        let custom = vec!["Childcare".to_string()];
        mock.categorize_among(&Transaction::new("Kita", false), &custom)
            .await
            .unwrap();
        assert_eq!(mock.offered_categories(), custom);
    }

    #[tokio::test]
    async fn test_mock_counters_shared_between_clones() {
        let mock = MockBackend::new().with_embedding("hello", vec![1.0, 0.0]);
        let clone = mock.clone();

        assert_eq!(clone.embedding("hello").await.unwrap(), vec![1.0, 0.0]);
        assert!(clone.embedding("missing").await.is_err());
        assert_eq!(mock.embedding_calls(), 2);
        assert_eq!(mock.categorize_calls(), 0);
    }

    #[tokio::test]
    async fn test_mock_failing() {
        let mock = MockBackend::new().failing();
        assert!(mock
            .categorize(&Transaction::new("Coop", false))
            .await
            .is_err());
        assert_eq!(mock.categorize_calls(), 1);
    }
}
