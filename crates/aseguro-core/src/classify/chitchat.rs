//! Chitchat router: detect casual-conversation intents and answer them
//! with canned replies

use super::corpus::{ChitchatCorpus, Intent};
use super::replies::ReplyPicker;
use super::similarity::{classify, ClassificationResult};
use crate::cache::EmbeddingCache;
use crate::cancel::cancellable;
use crate::error::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Cache key of the intent corpus
pub const CHITCHAT_CORPUS_ID: &str = "chitchat";

/// Default minimum similarity for a chitchat match
pub const DEFAULT_CHITCHAT_THRESHOLD: f32 = 0.85;

const FALLBACK_REPLY: &str = "Hola.";

pub struct ChitchatRouter {
    corpus: ChitchatCorpus,
    texts: Vec<String>,
    labels: Vec<Intent>,
    cache: Arc<EmbeddingCache>,
    threshold: f32,
    picker: ReplyPicker,
}

impl ChitchatRouter {
    pub fn new(corpus: ChitchatCorpus, cache: Arc<EmbeddingCache>, threshold: f32) -> Self {
        let texts = corpus.texts();
        let labels = corpus.labels();
        Self {
            corpus,
            texts,
            labels,
            cache,
            threshold,
            picker: ReplyPicker::new(None),
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.picker = ReplyPicker::new(seed);
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Build (or load) the intent corpus embeddings
    pub async fn warm(&self, cancel: &CancellationToken) -> Result<usize> {
        let vectors = self
            .cache
            .get_or_build(CHITCHAT_CORPUS_ID, &self.texts, cancel)
            .await?;
        Ok(vectors.len())
    }

    /// Best-matching intent for `text`, or no label below the threshold
    pub async fn detect(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<ClassificationResult<Intent>> {
        let references = self
            .cache
            .get_or_build(CHITCHAT_CORPUS_ID, &self.texts, cancel)
            .await?;
        let query = cancellable(cancel, "query embedding", self.cache.embedder().embed(text)).await?;

        let result = classify(&query, &references, &self.labels, self.threshold);
        if let Some(intent) = result.label {
            tracing::debug!(%intent, score = result.score, "chitchat intent detected");
        }
        Ok(result)
    }

    /// One canned reply for `intent`
    pub fn reply(&self, intent: Intent) -> String {
        self.picker
            .pick(self.corpus.replies_for(intent))
            .unwrap_or_else(|| FALLBACK_REPLY.to_string())
    }
}
