//! HTTP-based generator using external LLM service

use super::{ChatMessage, Generator, LLMClient};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Generator backed by an OpenAI-compatible chat endpoint
pub struct HttpGenerator {
    client: Arc<dyn LLMClient>,
}

impl HttpGenerator {
    /// Create from LLM client
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        self.client.chat_completion(messages).await
    }

    fn model_name(&self) -> &str {
        self.client.model_name()
    }
}
