//! Embedding similarity against category descriptions
//!
//! Every configured category is embedded once in a background task
//! ("Name: kw1, kw2"). Until that task finishes the strategy reports no match,
//! so building a categorizer never waits on the network.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::ai::{AIBackend, AIClient};
use crate::error::{Error, Result};
use crate::models::{Category, CategoryConfig, StrategyKind, StrategyResult, Transaction};

use super::CategorizationStrategy;

/// Minimum cosine similarity for a match
pub const SIMILARITY_THRESHOLD: f32 = 0.70;

type CategoryVectors = Vec<(String, Vec<f32>)>;

/// Cosine similarity of two vectors
///
/// Returns 0.0 for empty or mismatched-length inputs and when either vector
/// has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Embedding-based categorization
pub struct SemanticStrategy {
    client: Option<AIClient>,
    vectors: Arc<RwLock<CategoryVectors>>,
    initialized: Arc<AtomicBool>,
    warmup: Mutex<Option<JoinHandle<()>>>,
    timeout: Duration,
}

impl SemanticStrategy {
    /// Create the strategy and start embedding `categories` in the background
    ///
    /// Without a client the strategy never matches. Without a running tokio
    /// runtime the warm-up is skipped.
    pub fn new(client: Option<AIClient>, categories: Vec<CategoryConfig>, timeout: Duration) -> Self {
        let strategy = Self {
            client,
            vectors: Arc::new(RwLock::new(Vec::new())),
            initialized: Arc::new(AtomicBool::new(false)),
            warmup: Mutex::new(None),
            timeout,
        };
        strategy.start_warmup(categories);
        strategy
    }

    fn start_warmup(&self, categories: Vec<CategoryConfig>) {
        let Some(client) = self.client.clone() else {
            debug!("No AI client, semantic matching disabled");
            return;
        };

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No tokio runtime, skipping category embedding warm-up");
                return;
            }
        };

        let vectors = Arc::clone(&self.vectors);
        let initialized = Arc::clone(&self.initialized);
        let timeout = self.timeout;

        let handle = runtime.spawn(async move {
            let fresh = embed_categories(&client, &categories, timeout).await;
            let count = fresh.len();
            match vectors.write() {
                Ok(mut current) => *current = fresh,
                Err(_) => {
                    warn!("Category vector lock poisoned, warm-up discarded");
                    return;
                }
            }
            initialized.store(true, Ordering::SeqCst);
            info!(categories = count, "Semantic category embeddings ready");
        });

        if let Ok(mut slot) = self.warmup.lock() {
            if let Some(previous) = slot.replace(handle) {
                previous.abort();
            }
        }
    }

    /// Whether category embeddings are available
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Wait for a running warm-up to finish
    pub async fn wait_until_ready(&self) {
        let handle = self.warmup.lock().ok().and_then(|mut slot| slot.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    warn!(error = %e, "Category embedding warm-up failed");
                }
            }
        }
    }

    /// Re-embed a new category list; current vectors serve until it is done
    pub fn reload_categories(&self, categories: Vec<CategoryConfig>) {
        self.start_warmup(categories);
    }

    /// Stop a running warm-up
    pub fn shutdown(&self) {
        if let Ok(mut slot) = self.warmup.lock() {
            if let Some(handle) = slot.take() {
                handle.abort();
                debug!("Semantic warm-up aborted");
            }
        }
    }

    /// Best category and its score, if above the threshold
    pub async fn best_match(&self, transaction: &Transaction) -> Result<Option<(Category, f32)>> {
        let Some(ref client) = self.client else {
            return Ok(None);
        };
        if !self.is_initialized() {
            debug!(party = %transaction.party_name, "Semantic strategy not initialized yet");
            return Ok(None);
        }

        let text = format!("{} {}", transaction.party_name, transaction.description);
        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        let embedding = match tokio::time::timeout(self.timeout, client.embedding(text)).await {
            Ok(Ok(vector)) => vector,
            Ok(Err(e)) => {
                warn!(party = %transaction.party_name, error = %e, "Embedding request failed");
                return Ok(None);
            }
            Err(_) => {
                warn!(party = %transaction.party_name, timeout = ?self.timeout, "Embedding request timed out");
                return Ok(None);
            }
        };

        let vectors = self
            .vectors
            .read()
            .map_err(|_| Error::Lock("category vectors".into()))?;

        let mut best: Option<(&str, f32)> = None;
        for (name, vector) in vectors.iter() {
            let score = cosine_similarity(&embedding, vector);
            if best.map_or(true, |(_, top)| score > top) {
                best = Some((name.as_str(), score));
            }
        }

        match best {
            Some((name, score)) if score >= SIMILARITY_THRESHOLD => {
                debug!(party = %transaction.party_name, category = %name, score, "Semantic match");
                Ok(Some((Category::new(name), score)))
            }
            Some((name, score)) => {
                debug!(party = %transaction.party_name, closest = %name, score, "Semantic score below threshold");
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

impl Drop for SemanticStrategy {
    fn drop(&mut self) {
        if let Ok(slot) = self.warmup.get_mut() {
            if let Some(handle) = slot.take() {
                handle.abort();
            }
        }
    }
}

async fn embed_categories(
    client: &AIClient,
    categories: &[CategoryConfig],
    timeout: Duration,
) -> CategoryVectors {
    let mut vectors = Vec::with_capacity(categories.len());
    for category in categories {
        let text = category.embedding_text();
        match tokio::time::timeout(timeout, client.embedding(&text)).await {
            Ok(Ok(vector)) if !vector.is_empty() => vectors.push((category.name.clone(), vector)),
            Ok(Ok(_)) => warn!(category = %category.name, "Empty category embedding, skipping"),
            Ok(Err(e)) => warn!(category = %category.name, error = %e, "Failed to embed category, skipping"),
            Err(_) => warn!(category = %category.name, "Category embedding timed out, skipping"),
        }
    }
    vectors
}

#[async_trait]
impl CategorizationStrategy for SemanticStrategy {
    async fn categorize(&self, transaction: &Transaction) -> Result<Option<Category>> {
        Ok(self.best_match(transaction).await?.map(|(category, _)| category))
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Semantic
    }

    fn confidence(&self) -> f64 {
        SIMILARITY_THRESHOLD as f64
    }

    async fn evaluate(&self, transaction: &Transaction) -> StrategyResult {
        match self.best_match(transaction).await {
            Ok(Some((category, score))) => {
                StrategyResult::matched(self.kind(), category, score as f64)
            }
            Ok(None) => StrategyResult::not_found(self.kind()),
            Err(e) => StrategyResult::failed(self.kind(), e),
        }
    }
}
