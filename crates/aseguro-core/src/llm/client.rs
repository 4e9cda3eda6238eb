//! HTTP client for external LLM services (OpenAI, vLLM, etc.)

use super::memo::{embedding_memo_key, EmbeddingMemo};
use crate::config::LLMServiceConfig;
use crate::error::{AseguroError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Trait for LLM service clients
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate chat completion
    async fn chat_completion(&self, messages: Vec<ChatMessage>) -> Result<String>;

    /// Generate embeddings for text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get embedding dimensions
    fn embedding_dimensions(&self) -> usize;

    /// Get chat model name
    fn model_name(&self) -> &str;

    /// Get embedding model name
    fn embedding_model_name(&self) -> &str;
}

/// Chat message for completion requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// API metrics for monitoring
#[derive(Debug, Default)]
pub struct APIMetrics {
    pub total_requests: AtomicU64,
    pub total_errors: AtomicU64,
    pub memo_hits: AtomicU64,
    pub memo_misses: AtomicU64,
    pub total_latency_ms: AtomicU64,
}

/// Snapshot of API metrics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub total_errors: u64,
    pub memo_hits: u64,
    pub memo_misses: u64,
    pub avg_latency_ms: f64,
}

const MAX_COMPLETION_TOKENS: u32 = 1500;

/// OpenAI-compatible client (works against OpenAI, vLLM, LiteLLM, ...)
pub struct OpenAICompatClient {
    http_client: reqwest::Client,
    config: LLMServiceConfig,
    embedding_dimensions: usize,
    memo: Arc<EmbeddingMemo>,
    metrics: Arc<APIMetrics>,
}

impl OpenAICompatClient {
    /// Create new client from configuration
    pub fn new(config: LLMServiceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(AseguroError::Http)?;

        // text-embedding-3-large
        let embedding_dimensions = config.embedding_dimensions.unwrap_or(3072);

        Ok(Self {
            http_client,
            config,
            embedding_dimensions,
            memo: Arc::new(EmbeddingMemo::new()),
            metrics: Arc::new(APIMetrics::default()),
        })
    }

    /// Get current API metrics
    pub fn metrics(&self) -> MetricsSnapshot {
        let total = self.metrics.total_requests.load(Ordering::Relaxed);

        MetricsSnapshot {
            total_requests: total,
            total_errors: self.metrics.total_errors.load(Ordering::Relaxed),
            memo_hits: self.metrics.memo_hits.load(Ordering::Relaxed),
            memo_misses: self.metrics.memo_misses.load(Ordering::Relaxed),
            avg_latency_ms: if total > 0 {
                self.metrics.total_latency_ms.load(Ordering::Relaxed) as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.api_key {
            Some(ref api_key) => req.header("Authorization", format!("Bearer {}", api_key)),
            None => req,
        }
    }

    fn record_error(&self) {
        self.metrics.total_errors.fetch_add(1, Ordering::Relaxed);
    }

    fn record_latency(&self, start: Instant) {
        let elapsed = start.elapsed().as_millis() as u64;
        self.metrics
            .total_latency_ms
            .fetch_add(elapsed, Ordering::Relaxed);
    }

    async fn check_status(&self, response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        self.record_error();
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Err(AseguroError::ExternalError(format!(
            "{} service error (HTTP {}): {}",
            what, status, body
        )))
    }
}

#[async_trait]
impl LLMClient for OpenAICompatClient {
    async fn chat_completion(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let start = Instant::now();
        self.metrics.total_requests.fetch_add(1, Ordering::Relaxed);

        #[derive(Serialize)]
        struct ChatRequest {
            model: String,
            messages: Vec<ChatMessage>,
            temperature: f32,
            max_tokens: u32,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: ChatMessage,
        }

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature: 0.0,
            max_tokens: MAX_COMPLETION_TOKENS,
        };

        let url = format!("{}/v1/chat/completions", self.config.url.trim_end_matches('/'));
        let req = self.authorize(self.http_client.post(&url).json(&request));

        let response = req.send().await.map_err(|e| {
            self.record_error();
            AseguroError::Http(e)
        })?;
        let response = self.check_status(response, "LLM").await?;

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            self.record_error();
            AseguroError::Http(e)
        })?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| {
                self.record_error();
                AseguroError::Llm("No response from LLM".to_string())
            })?
            .message
            .content;

        self.record_latency(start);
        tracing::debug!(
            model = %self.config.model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "chat completion finished"
        );

        Ok(content)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let key = embedding_memo_key(&self.config.embedding_model, text);
        if let Some(vector) = self.memo.get(&key) {
            self.metrics.memo_hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!("Query embedding served from memo");
            return Ok(vector);
        }
        self.metrics.memo_misses.fetch_add(1, Ordering::Relaxed);

        let vector = self
            .embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| AseguroError::Embedding("No embedding returned".to_string()))?;

        self.memo.set(key, vector.clone());
        Ok(vector)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();
        self.metrics.total_requests.fetch_add(1, Ordering::Relaxed);

        #[derive(Serialize)]
        struct EmbedRequest<'a> {
            model: &'a str,
            input: &'a [String],
        }

        #[derive(Deserialize)]
        struct EmbedResponse {
            data: Vec<EmbedData>,
        }

        #[derive(Deserialize)]
        struct EmbedData {
            #[serde(default)]
            index: Option<usize>,
            embedding: Vec<f32>,
        }

        let request = EmbedRequest {
            model: &self.config.embedding_model,
            input: texts,
        };

        let url = format!(
            "{}/v1/embeddings",
            self.config.embeddings_url().trim_end_matches('/')
        );
        let req = self.authorize(self.http_client.post(&url).json(&request));

        let response = req.send().await.map_err(|e| {
            self.record_error();
            AseguroError::Http(e)
        })?;
        let response = self.check_status(response, "Embedding").await?;

        let embed_response: EmbedResponse = response.json().await.map_err(|e| {
            self.record_error();
            AseguroError::Http(e)
        })?;

        if embed_response.data.len() != texts.len() {
            self.record_error();
            return Err(AseguroError::Embedding(format!(
                "expected {} embeddings, service returned {}",
                texts.len(),
                embed_response.data.len()
            )));
        }

        // The API may return items out of order; `index` restores input order.
        let mut data = embed_response.data;
        if data.iter().all(|d| d.index.is_some()) {
            data.sort_by_key(|d| d.index);
        }

        self.record_latency(start);
        tracing::debug!(count = texts.len(), "embedding batch finished");

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    fn embedding_dimensions(&self) -> usize {
        self.embedding_dimensions
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn embedding_model_name(&self) -> &str {
        &self.config.embedding_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_roles() {
        assert_eq!(ChatMessage::system("x").role, "system");
        assert_eq!(ChatMessage::user("y").role, "user");
    }

    #[test]
    fn test_client_defaults() {
        let config = LLMServiceConfig {
            url: "http://localhost:8000".to_string(),
            model: "gpt-4o-mini".to_string(),
            embedding_url: None,
            embedding_model: "text-embedding-3-large".to_string(),
            embedding_dimensions: None,
            api_key: None,
            timeout_secs: 5,
        };
        let client = OpenAICompatClient::new(config).unwrap();
        assert_eq!(client.embedding_dimensions(), 3072);
        assert_eq!(client.model_name(), "gpt-4o-mini");
        assert_eq!(client.embedding_model_name(), "text-embedding-3-large");

        let metrics = client.metrics();
        assert_eq!(metrics.total_requests, 0);
        assert_eq!(metrics.avg_latency_ms, 0.0);
    }
}
