//! Configuration management

use crate::error::{AseguroError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM service configuration
    #[serde(default)]
    pub llm_service: LLMServiceConfig,

    /// Security filter tuning
    #[serde(default)]
    pub security: SecurityConfig,

    /// Chitchat router tuning
    #[serde(default)]
    pub chitchat: ChitchatConfig,

    /// Retrieval and comparison pipeline sizes
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Tool selection
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Directory holding persisted reference-phrase embeddings
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,

    /// SQLite file holding policy passages and their embeddings
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Seed for canned-reply selection (random when unset)
    #[serde(default)]
    pub seed: Option<u64>,
}

/// LLM service configuration for external inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMServiceConfig {
    /// Base URL of the OpenAI-compatible service for chat completions
    pub url: String,

    /// Model name for chat completions (rerank, answers, extraction)
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Base URL for embeddings service (can be different from LLM URL)
    #[serde(default)]
    pub embedding_url: Option<String>,

    /// Model name for embeddings
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,

    /// Embedding width; defaults to 3072. Reference vectors of another width are rejected.
    #[serde(default)]
    pub embedding_dimensions: Option<usize>,

    /// API key (optional, for authenticated services)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl LLMServiceConfig {
    /// Get the embeddings URL (falls back to main URL if not specified)
    pub fn embeddings_url(&self) -> &str {
        self.embedding_url.as_deref().unwrap_or(&self.url)
    }
}

impl Default for LLMServiceConfig {
    fn default() -> Self {
        Self {
            url: std::env::var("ASEGURO_LLM_URL")
                .unwrap_or_else(|_| "https://api.openai.com".to_string()),
            model: default_chat_model(),
            embedding_url: std::env::var("ASEGURO_EMBEDDING_URL").ok(),
            embedding_model: default_embedding_model(),
            embedding_dimensions: std::env::var("ASEGURO_EMBEDDING_DIMS")
                .ok()
                .and_then(|s| s.parse().ok()),
            api_key: std::env::var("ASEGURO_LLM_API_KEY").ok(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_chat_model() -> String {
    std::env::var("ASEGURO_LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string())
}

fn default_embedding_model() -> String {
    std::env::var("ASEGURO_EMBEDDING_MODEL")
        .unwrap_or_else(|_| "text-embedding-3-large".to_string())
}

fn default_timeout() -> u64 {
    30
}

/// Security filter settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Minimum cosine similarity against the threat corpus to block
    #[serde(default = "default_security_threshold")]
    pub threshold: f32,

    /// Refuse the query when the semantic gate cannot run
    #[serde(default = "default_true")]
    pub fail_closed: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            threshold: default_security_threshold(),
            fail_closed: true,
        }
    }
}

fn default_security_threshold() -> f32 {
    0.82
}

/// Chitchat router settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChitchatConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Minimum cosine similarity against an intent example to short-circuit
    #[serde(default = "default_chitchat_threshold")]
    pub threshold: f32,
}

impl Default for ChitchatConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            threshold: default_chitchat_threshold(),
        }
    }
}

fn default_chitchat_threshold() -> f32 {
    0.85
}

/// Retrieval pipeline sizes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Candidates fetched from the vector store before reranking
    #[serde(default = "default_candidate_k")]
    pub candidate_k: usize,

    /// Passages kept after reranking
    #[serde(default = "default_rerank_top_n")]
    pub rerank_top_n: usize,

    /// Characters of each candidate shown to the reranker
    #[serde(default = "default_snippet_chars")]
    pub snippet_chars: usize,

    /// Passages fetched per insurer for comparisons
    #[serde(default = "default_comparison_k")]
    pub comparison_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            candidate_k: default_candidate_k(),
            rerank_top_n: default_rerank_top_n(),
            snippet_chars: default_snippet_chars(),
            comparison_k: default_comparison_k(),
        }
    }
}

fn default_candidate_k() -> usize {
    15
}

fn default_rerank_top_n() -> usize {
    5
}

fn default_snippet_chars() -> usize {
    200
}

fn default_comparison_k() -> usize {
    5
}

/// Tool selection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Let the generation service choose between consult and compare
    #[serde(default = "default_true")]
    pub auto_select: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self { auto_select: true }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load config from default path
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path())
    }

    /// Load config from an explicit path; a missing file yields defaults
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_yaml::from_str(&content)?
        } else {
            Config::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Save config to default path
    pub fn save(&self) -> Result<()> {
        self.save_to(Self::default_path())
    }

    /// Save config to an explicit path
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yaml")
    }

    /// Directory for persisted embedding caches
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(crate::CACHE_DIR_NAME)
                .join("embeddings")
        })
    }

    /// Passage database path (`ASEGURO_DB` wins over the config file)
    pub fn database_path(&self) -> PathBuf {
        if let Ok(path) = std::env::var("ASEGURO_DB") {
            return PathBuf::from(path);
        }
        self.database_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(crate::DATA_DIR_NAME)
                .join("passages.sqlite")
        })
    }

    /// Reject settings the pipelines cannot honour
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("security.threshold", self.security.threshold),
            ("chitchat.threshold", self.chitchat.threshold),
        ] {
            if !(-1.0..=1.0).contains(&value) {
                return Err(AseguroError::Config(format!(
                    "{} must be within [-1, 1], got {}",
                    name, value
                )));
            }
        }

        let r = &self.retrieval;
        if r.candidate_k == 0 || r.rerank_top_n == 0 || r.comparison_k == 0 {
            return Err(AseguroError::Config(
                "retrieval sizes must be greater than zero".to_string(),
            ));
        }
        if r.rerank_top_n > r.candidate_k {
            return Err(AseguroError::Config(format!(
                "retrieval.rerank_top_n ({}) exceeds retrieval.candidate_k ({})",
                r.rerank_top_n, r.candidate_k
            )));
        }

        Ok(())
    }
}
