//! Test utilities for tally-core
//!
//! A mock AI provider speaking both the OpenAI-compatible and the Ollama HTTP
//! APIs, for backend tests and local development without a provider account.

use axum::{
    extract::Json,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::sync::oneshot;

/// Length of the vectors returned by the mock embedding endpoints
pub const EMBEDDING_DIMENSIONS: usize = 16;

/// Mock AI server for testing and development
pub struct MockAiServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockAiServer {
    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let app = Router::new()
            .route("/v1/models", get(handle_models))
            .route("/v1/chat/completions", post(handle_chat_completions))
            .route("/v1/embeddings", post(handle_openai_embeddings))
            .route("/api/tags", get(handle_tags))
            .route("/api/generate", post(handle_generate))
            .route("/api/embeddings", post(handle_ollama_embeddings));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockAiServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn has_bearer(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("Bearer ") && v.len() > 7)
        .unwrap_or(false)
}

async fn handle_models(headers: HeaderMap) -> Result<Json<ModelsResponse>, StatusCode> {
    if !has_bearer(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(ModelsResponse {
        object: "list".to_string(),
        data: vec![ModelEntry {
            id: "mock".to_string(),
        }],
    }))
}

async fn handle_chat_completions(
    headers: HeaderMap,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, StatusCode> {
    if !has_bearer(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let prompt = request
        .messages
        .last()
        .map(|m| m.content.as_str())
        .unwrap_or_default();

    // Chat models tend to add a label; the client is expected to strip it
    let content = format!("Category: {}", answer_for(prompt));

    Ok(Json(ChatResponse {
        model: request.model,
        choices: vec![ChatChoice {
            index: 0,
            message: ChatMessage {
                role: "assistant".to_string(),
                content,
            },
            finish_reason: "stop".to_string(),
        }],
    }))
}

async fn handle_openai_embeddings(
    headers: HeaderMap,
    Json(request): Json<OpenAiEmbeddingRequest>,
) -> Result<Json<OpenAiEmbeddingResponse>, StatusCode> {
    if !has_bearer(&headers) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(OpenAiEmbeddingResponse {
        object: "list".to_string(),
        model: request.model,
        data: vec![OpenAiEmbeddingData {
            index: 0,
            embedding: embed(&request.input),
        }],
    }))
}

/// Ollama tags endpoint response (health check)
async fn handle_tags() -> Json<TagsResponse> {
    Json(TagsResponse {
        models: vec![ModelInfo {
            name: "llama3.2:latest".to_string(),
            size: 2_000_000_000,
        }],
    })
}

async fn handle_generate(Json(request): Json<GenerateRequest>) -> Json<GenerateResponse> {
    Json(GenerateResponse {
        model: request.model,
        response: answer_for(&request.prompt).to_string(),
        done: true,
    })
}

async fn handle_ollama_embeddings(
    Json(request): Json<OllamaEmbeddingRequest>,
) -> Json<OllamaEmbeddingResponse> {
    Json(OllamaEmbeddingResponse {
        embedding: embed(&request.prompt),
    })
}

/// Pick a category for the party named in the prompt's transaction section
fn answer_for(prompt: &str) -> &'static str {
    let party = extract_party(prompt).to_uppercase();

    if party.contains("SBB") || party.contains("POSTAUTO") || party.contains("UBER") {
        "Transportation"
    } else if party.contains("MIGROS") || party.contains("COOP") || party.contains("DENNER") {
        "Groceries"
    } else if party.contains("NETFLIX") || party.contains("SPOTIFY") {
        "Subscriptions"
    } else if party.contains("GALAXUS") || party.contains("ZALANDO") {
        "Shopping"
    } else if party.contains("CSS") || party.contains("HELSANA") {
        "Insurance"
    } else {
        "Unknown"
    }
}

/// Party line after the "Transaction:" header
///
/// The few-shot examples also contain merchant names, so the whole prompt
/// can't be searched.
fn extract_party(prompt: &str) -> &str {
    let section = prompt
        .rfind("Transaction:")
        .map(|start| &prompt[start..])
        .unwrap_or(prompt);

    section
        .lines()
        .find_map(|line| line.strip_prefix("Party: "))
        .map(str::trim)
        .unwrap_or_default()
}

/// Deterministic bag-of-bytes embedding
fn embed(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; EMBEDDING_DIMENSIONS];
    for byte in text.to_lowercase().bytes().filter(u8::is_ascii_alphanumeric) {
        vector[byte as usize % EMBEDDING_DIMENSIONS] += 1.0;
    }
    // Keep the vector non-zero so cosine similarity is defined
    vector[0] += 1.0;
    vector
}

// Request/Response types for the mock server

#[derive(Debug, Serialize)]
struct ModelsResponse {
    object: String,
    data: Vec<ModelEntry>,
}

#[derive(Debug, Serialize)]
struct ModelEntry {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatRequestMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatRequestMessage {
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    model: String,
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Serialize)]
struct ChatChoice {
    index: u32,
    message: ChatMessage,
    finish_reason: String,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingRequest {
    model: String,
    input: String,
}

#[derive(Debug, Serialize)]
struct OpenAiEmbeddingResponse {
    object: String,
    model: String,
    data: Vec<OpenAiEmbeddingData>,
}

#[derive(Debug, Serialize)]
struct OpenAiEmbeddingData {
    index: u32,
    embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct TagsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Debug, Serialize)]
struct ModelInfo {
    name: String,
    size: u64,
}

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
}

#[derive(Debug, Serialize)]
struct GenerateResponse {
    model: String,
    response: String,
    done: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingRequest {
    prompt: String,
}

#[derive(Debug, Serialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::prompts::categorization_prompt;
    use crate::models::{standard_category_names, Transaction};

    #[test]
    fn test_extract_party_skips_examples() {
        let tx = Transaction::new("Kiosk Bahnhof", false);
        let prompt = categorization_prompt(&tx, &standard_category_names());
        assert_eq!(extract_party(&prompt), "Kiosk Bahnhof");
        assert_eq!(answer_for(&prompt), "Unknown");
    }

    #[test]
    fn test_answer_for_known_party() {
        let tx = Transaction::new("SBB CFF FFS", true);
        let prompt = categorization_prompt(&tx, &standard_category_names());
        assert_eq!(answer_for(&prompt), "Transportation");
    }

    #[test]
    fn test_embed_is_deterministic() {
        let a = embed("Groceries: MIGROS");
        assert_eq!(a, embed("groceries: migros"));
        assert_eq!(a.len(), EMBEDDING_DIMENSIONS);
        assert_ne!(a, embed("Transportation: SBB"));
    }

    #[tokio::test]
    async fn test_mock_server_requires_bearer_on_openai_routes() {
        let server = MockAiServer::start().await;
        let client = reqwest::Client::new();

        let unauthorized = client
            .get(format!("{}/v1/models", server.url()))
            .send()
            .await
            .unwrap();
        assert_eq!(unauthorized.status(), reqwest::StatusCode::UNAUTHORIZED);

        let authorized = client
            .get(format!("{}/v1/models", server.url()))
            .header("Authorization", "Bearer sk-test")
            .send()
            .await
            .unwrap();
        assert!(authorized.status().is_success());
    }
}
