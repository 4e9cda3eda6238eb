//! LLM integration
//!
//! Provides traits and implementations for:
//! - Embedding generation via external services (OpenAI, vLLM, etc.)
//! - Text generation (rerank judgments, answers, structured extraction)
//! - Tool selection between consultation and comparison

mod client;
mod http_embedder;
mod http_generator;
mod memo;
mod tool_selector;
mod traits;

pub use client::{ChatMessage, LLMClient, MetricsSnapshot, OpenAICompatClient};
pub use http_embedder::HttpEmbedder;
pub use http_generator::HttpGenerator;
pub use memo::{embedding_memo_key, EmbeddingMemo};
pub use tool_selector::{parse_tool_choice, ToolChoice, ToolSelector};
pub use traits::*;
