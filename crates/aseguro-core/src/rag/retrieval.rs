//! Single-query retrieval-augmented answering
//!
//! Linear pipeline: retrieve `candidate_k` passages, let the generation
//! service pick the `rerank_top_n` most relevant ones, then generate a
//! structured answer from those.

use super::prompts::{answer_messages, format_passages, rerank_messages};
use super::rerank::parse_rerank_indices;
use crate::cancel::cancellable;
use crate::config::RetrievalConfig;
use crate::error::{AseguroError, Result};
use crate::llm::Generator;
use crate::store::{RetrievedPassage, VectorStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Result of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RetrievalOutcome {
    /// The vector store returned nothing for the query
    NoInformation,
    Answer {
        text: String,
        /// Passages given to the generator, in context order
        sources: Vec<RetrievedPassage>,
        /// False when the rerank step fell back to retrieval order
        reranked: bool,
    },
}

pub struct RetrievalPipeline {
    store: Arc<dyn VectorStore>,
    generator: Arc<dyn Generator>,
    options: RetrievalConfig,
}

impl RetrievalPipeline {
    pub fn new(
        store: Arc<dyn VectorStore>,
        generator: Arc<dyn Generator>,
        options: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            generator,
            options,
        }
    }

    pub fn options(&self) -> &RetrievalConfig {
        &self.options
    }

    /// Answer `query` from the stored policy passages
    pub async fn answer(&self, query: &str, cancel: &CancellationToken) -> Result<RetrievalOutcome> {
        let candidates = self
            .store
            .search(query, self.options.candidate_k, None, cancel)
            .await?;

        if candidates.is_empty() {
            tracing::info!("retrieval returned no passages");
            return Ok(RetrievalOutcome::NoInformation);
        }

        let (chosen, reranked) = self.rerank(query, candidates, cancel).await?;
        let context = format_passages(&chosen);

        let text = cancellable(
            cancel,
            "answer generation",
            self.generator.complete(answer_messages(query, &context)),
        )
        .await?;

        Ok(RetrievalOutcome::Answer {
            text,
            sources: chosen,
            reranked,
        })
    }

    /// Keep the passages the generation service judges most relevant.
    ///
    /// Any failure other than cancellation falls back to the first
    /// `rerank_top_n` candidates in retrieval order.
    pub async fn rerank(
        &self,
        query: &str,
        candidates: Vec<RetrievedPassage>,
        cancel: &CancellationToken,
    ) -> Result<(Vec<RetrievedPassage>, bool)> {
        let top_n = self.options.rerank_top_n;
        let messages = rerank_messages(query, &candidates, top_n, self.options.snippet_chars);

        let indices = match cancellable(cancel, "rerank", self.generator.complete(messages)).await {
            Ok(response) => {
                let indices = parse_rerank_indices(&response, candidates.len(), top_n);
                if indices.is_empty() {
                    tracing::warn!("Rerank reply had no usable indices, keeping retrieval order");
                    tracing::debug!("Raw rerank response: {}", response);
                }
                indices
            }
            Err(e @ AseguroError::Cancelled(_)) => return Err(e),
            Err(e) => {
                tracing::warn!("Rerank failed, keeping retrieval order: {}", e);
                Vec::new()
            }
        };

        if indices.is_empty() {
            let mut fallback = candidates;
            fallback.truncate(top_n);
            return Ok((fallback, false));
        }

        tracing::debug!(?indices, "reranked candidates");
        let mut slots: Vec<Option<RetrievedPassage>> = candidates.into_iter().map(Some).collect();
        let chosen = indices
            .into_iter()
            .filter_map(|idx| slots.get_mut(idx).and_then(Option::take))
            .collect();
        Ok((chosen, true))
    }
}
