//! Aseguro Core Library
//!
//! Semantic routing and retrieval-augmented answering for an insurance
//! policy assistant.
//!
//! # Features
//! - Lexical and embedding-based security filtering of queries and answers
//! - Chitchat intent detection with canned replies
//! - Retrieve, LLM-rerank and generate over insurer-tagged policy passages
//! - Concurrent per-insurer retrieval for feature comparison tables
//! - Content-hash keyed embedding cache for the reference corpora

pub mod assistant;
pub mod cache;
pub mod cancel;
pub mod classify;
pub mod config;
pub mod error;
pub mod llm;
pub mod rag;
pub mod store;

pub use assistant::{Assistant, AssistantResponse, Services};
pub use cache::{CacheLookup, CacheStore, EmbeddingCache, FileCacheStore, MemoryCacheStore};
pub use classify::{
    BlockReason, ChitchatCorpus, ChitchatRouter, ClassificationResult, Intent,
    NearestNeighborClassifier, SecurityCorpus, SecurityFilter, SecurityVerdict,
};
pub use config::{Config, LLMServiceConfig};
pub use error::{AseguroError, Error, Result};
pub use llm::{
    ChatMessage, Embedder, Generator, HttpEmbedder, HttpGenerator, LLMClient, MetricsSnapshot,
    OpenAICompatClient, ToolChoice, ToolSelector,
};
pub use rag::{
    ComparisonOutcome, ComparisonPipeline, ComparisonResult, ComparisonRow, RetrievalOutcome,
    RetrievalPipeline,
};
pub use store::{PassageRecord, RetrievedPassage, SearchFilter, SqliteVectorStore, VectorStore};

/// Default cache directory name
pub const CACHE_DIR_NAME: &str = "aseguro";

/// Default data directory name (passage database)
pub const DATA_DIR_NAME: &str = "aseguro";

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "aseguro";
