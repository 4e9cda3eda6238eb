//! Security filter: lexical block lists plus a semantic threat classifier

use super::corpus::SecurityCorpus;
use super::replies::ReplyPicker;
use super::similarity::classify;
use crate::cache::EmbeddingCache;
use crate::cancel::cancellable;
use crate::error::{AseguroError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Cache key of the threat corpus
pub const SECURITY_CORPUS_ID: &str = "security";

/// Default minimum similarity for a semantic block
pub const DEFAULT_SECURITY_THRESHOLD: f32 = 0.82;

const FALLBACK_REFUSAL: &str = "Lo siento, pero no puedo responder a tu pregunta.";

/// Why a text was blocked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "gate", rename_all = "snake_case")]
pub enum BlockReason {
    /// Inbound text contains a blocked term
    Lexical { term: String },
    /// Inbound text is close to a known attack phrase
    Semantic { phrase: String, score: f32 },
    /// The semantic gate could not run and the filter fails closed
    SemanticUnavailable { error: String },
    /// Generated text contains a forbidden output term
    Output { term: String },
}

impl BlockReason {
    /// Trigger surfaced to operators
    pub fn trigger(&self) -> &str {
        match self {
            BlockReason::Lexical { term } | BlockReason::Output { term } => term,
            BlockReason::Semantic { phrase, .. } => phrase,
            BlockReason::SemanticUnavailable { error } => error,
        }
    }
}

/// Result of the semantic gate alone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticVerdict {
    pub blocked: bool,
    pub matched_phrase: Option<String>,
    pub score: f32,
}

/// Combined verdict on an inbound query
#[derive(Debug, Clone, PartialEq)]
pub enum SecurityVerdict {
    Allowed,
    Blocked(BlockReason),
    /// Lexical gate passed but the semantic gate could not run
    Degraded { error: String },
}

/// Screens inbound queries and outbound generated text
pub struct SecurityFilter {
    corpus: SecurityCorpus,
    lowered_input: Vec<String>,
    lowered_output: Vec<String>,
    cache: Arc<EmbeddingCache>,
    threshold: f32,
    fail_closed: bool,
    picker: ReplyPicker,
}

impl SecurityFilter {
    pub fn new(corpus: SecurityCorpus, cache: Arc<EmbeddingCache>, threshold: f32) -> Self {
        let lowered_input = corpus.input_terms.iter().map(|t| t.to_lowercase()).collect();
        let lowered_output = corpus.output_terms.iter().map(|t| t.to_lowercase()).collect();
        Self {
            corpus,
            lowered_input,
            lowered_output,
            cache,
            threshold,
            fail_closed: true,
            picker: ReplyPicker::new(None),
        }
    }

    /// Continue on the lexical verdict alone when the semantic gate fails
    pub fn with_fail_closed(mut self, fail_closed: bool) -> Self {
        self.fail_closed = fail_closed;
        self
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.picker = ReplyPicker::new(seed);
        self
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn corpus(&self) -> &SecurityCorpus {
        &self.corpus
    }

    /// First inbound block term contained in `message`, case-insensitive
    pub fn check_input(&self, message: &str) -> Option<&str> {
        first_contained(message, &self.lowered_input, &self.corpus.input_terms)
    }

    /// First forbidden output term contained in `response`, case-insensitive
    pub fn check_output(&self, response: &str) -> Option<&str> {
        first_contained(response, &self.lowered_output, &self.corpus.output_terms)
    }

    /// Build (or load) the threat corpus embeddings
    pub async fn warm(&self, cancel: &CancellationToken) -> Result<usize> {
        let vectors = self.reference_vectors(cancel).await?;
        Ok(vectors.len())
    }

    /// Compare `text` against the threat corpus
    pub async fn check_semantic(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<SemanticVerdict> {
        let phrases = self.threat_texts();
        let references = self.reference_vectors(cancel).await?;
        let query = cancellable(cancel, "query embedding", self.cache.embedder().embed(text)).await?;

        let labels: Vec<usize> = (0..phrases.len()).collect();
        let result = classify(&query, &references, &labels, self.threshold);

        Ok(match result.label {
            Some(idx) => SemanticVerdict {
                blocked: true,
                matched_phrase: phrases.get(idx).cloned(),
                score: result.score,
            },
            None => SemanticVerdict {
                blocked: false,
                matched_phrase: None,
                score: 0.0,
            },
        })
    }

    /// Lexical gate, then semantic gate.
    ///
    /// Only cancellation propagates as an error; any other semantic-gate
    /// failure becomes a block (fail closed) or [`SecurityVerdict::Degraded`].
    pub async fn screen_input(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<SecurityVerdict> {
        if let Some(term) = self.check_input(text) {
            tracing::info!(gate = "lexical", term, "query blocked");
            return Ok(SecurityVerdict::Blocked(BlockReason::Lexical {
                term: term.to_string(),
            }));
        }

        match self.check_semantic(text, cancel).await {
            Ok(verdict) if verdict.blocked => {
                let phrase = verdict.matched_phrase.unwrap_or_default();
                tracing::info!(gate = "semantic", phrase = %phrase, score = verdict.score, "query blocked");
                Ok(SecurityVerdict::Blocked(BlockReason::Semantic {
                    phrase,
                    score: verdict.score,
                }))
            }
            Ok(_) => Ok(SecurityVerdict::Allowed),
            Err(e @ AseguroError::Cancelled(_)) => Err(e),
            Err(e) if self.fail_closed => {
                tracing::warn!("Semantic security gate unavailable, refusing query: {}", e);
                Ok(SecurityVerdict::Blocked(BlockReason::SemanticUnavailable {
                    error: e.to_string(),
                }))
            }
            Err(e) => {
                tracing::warn!("Semantic security gate unavailable, lexical gate only: {}", e);
                Ok(SecurityVerdict::Degraded {
                    error: e.to_string(),
                })
            }
        }
    }

    /// Output gate over generated text
    pub fn screen_output(&self, text: &str) -> Option<BlockReason> {
        self.check_output(text).map(|term| {
            tracing::info!(gate = "output", term, "generated text blocked");
            BlockReason::Output {
                term: term.to_string(),
            }
        })
    }

    /// One canned refusal
    pub fn refusal(&self) -> String {
        self.picker
            .pick(&self.corpus.refusals)
            .unwrap_or_else(|| FALLBACK_REFUSAL.to_string())
    }

    fn threat_texts(&self) -> Vec<String> {
        self.corpus
            .threat_phrases()
            .into_iter()
            .map(|p| p.text)
            .collect()
    }

    async fn reference_vectors(&self, cancel: &CancellationToken) -> Result<Arc<Vec<Vec<f32>>>> {
        self.cache
            .get_or_build(SECURITY_CORPUS_ID, &self.threat_texts(), cancel)
            .await
    }
}

fn first_contained<'a>(text: &str, lowered: &[String], original: &'a [String]) -> Option<&'a str> {
    let text = text.to_lowercase();
    lowered
        .iter()
        .zip(original)
        .find(|(term, _)| !term.is_empty() && text.contains(term.as_str()))
        .map(|(_, term)| term.as_str())
}
