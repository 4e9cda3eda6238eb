//! Query routing: security gate, chitchat short-circuit, tool selection,
//! retrieval or comparison, then the output gate.

use crate::cache::{EmbeddingCache, FileCacheStore};
use crate::classify::{
    BlockReason, ChitchatCorpus, ChitchatRouter, Intent, SecurityCorpus, SecurityFilter,
    SecurityVerdict, CHITCHAT_CORPUS_ID, SECURITY_CORPUS_ID,
};
use crate::config::Config;
use crate::error::{AseguroError, Result};
use crate::llm::{
    Embedder, Generator, HttpEmbedder, HttpGenerator, LLMClient, OpenAICompatClient, ToolChoice,
    ToolSelector,
};
use crate::rag::{
    ComparisonOutcome, ComparisonPipeline, RetrievalOutcome, RetrievalPipeline,
    NO_INFORMATION_MESSAGE,
};
use crate::store::{RetrievedPassage, SqliteVectorStore, VectorStore};
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What the assistant answers to one query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AssistantResponse {
    /// Refused by the security filter
    Blocked { reply: String, reason: BlockReason },
    /// Canned casual-conversation reply
    Chitchat {
        reply: String,
        intent: Intent,
        score: f32,
    },
    /// Generated answer with the passages it was grounded on
    Answer {
        text: String,
        sources: Vec<RetrievedPassage>,
    },
    /// Retrieval found nothing
    NoInformation { text: String },
    Comparison(ComparisonOutcome),
    /// An upstream failure prevented an answer
    Failed { reason: String },
}

impl AssistantResponse {
    /// Text shown to the end user
    pub fn reply_text(&self) -> Option<&str> {
        match self {
            AssistantResponse::Blocked { reply, .. } | AssistantResponse::Chitchat { reply, .. } => {
                Some(reply.as_str())
            }
            AssistantResponse::Answer { text, .. } | AssistantResponse::NoInformation { text } => {
                Some(text.as_str())
            }
            AssistantResponse::Comparison(_) | AssistantResponse::Failed { .. } => None,
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, AssistantResponse::Blocked { .. })
    }
}

/// Production collaborators built from configuration
pub struct Services {
    pub client: Arc<OpenAICompatClient>,
    pub embedder: Arc<dyn Embedder>,
    pub generator: Arc<dyn Generator>,
    pub cache: Arc<EmbeddingCache>,
    pub store: Arc<SqliteVectorStore>,
}

impl Services {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Arc::new(OpenAICompatClient::new(config.llm_service.clone())?);
        let shared: Arc<dyn LLMClient> = client.clone();
        let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::new(Arc::clone(&shared)));
        let generator: Arc<dyn Generator> = Arc::new(HttpGenerator::new(shared));

        let cache = Arc::new(EmbeddingCache::new(
            Arc::new(FileCacheStore::new(config.cache_dir())),
            Arc::clone(&embedder),
        ));
        let store = Arc::new(SqliteVectorStore::open(
            config.database_path(),
            Arc::clone(&embedder),
        )?);

        Ok(Self {
            client,
            embedder,
            generator,
            cache,
            store,
        })
    }
}

pub struct Assistant {
    security: SecurityFilter,
    chitchat: Option<ChitchatRouter>,
    tools: Option<ToolSelector>,
    retrieval: RetrievalPipeline,
    comparison: ComparisonPipeline,
}

impl Assistant {
    /// Assistant without chitchat routing or tool selection
    pub fn new(
        security: SecurityFilter,
        retrieval: RetrievalPipeline,
        comparison: ComparisonPipeline,
    ) -> Self {
        Self {
            security,
            chitchat: None,
            tools: None,
            retrieval,
            comparison,
        }
    }

    pub fn with_chitchat(mut self, router: ChitchatRouter) -> Self {
        self.chitchat = Some(router);
        self
    }

    pub fn with_tool_selector(mut self, selector: ToolSelector) -> Self {
        self.tools = Some(selector);
        self
    }

    /// Build the production graph from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let services = Services::from_config(config)?;
        Ok(Self::from_services(config, &services))
    }

    pub fn from_services(config: &Config, services: &Services) -> Self {
        let store: Arc<dyn VectorStore> = services.store.clone();

        let security = SecurityFilter::new(
            SecurityCorpus::default(),
            Arc::clone(&services.cache),
            config.security.threshold,
        )
        .with_fail_closed(config.security.fail_closed)
        .with_seed(config.seed);

        let retrieval = RetrievalPipeline::new(
            Arc::clone(&store),
            Arc::clone(&services.generator),
            config.retrieval.clone(),
        );
        let comparison = ComparisonPipeline::new(
            store,
            Arc::clone(&services.generator),
            config.retrieval.comparison_k,
        );

        let mut assistant = Self::new(security, retrieval, comparison);
        if config.chitchat.enabled {
            assistant = assistant.with_chitchat(
                ChitchatRouter::new(
                    ChitchatCorpus::default(),
                    Arc::clone(&services.cache),
                    config.chitchat.threshold,
                )
                .with_seed(config.seed.map(|s| s.wrapping_add(1))),
            );
        }
        if config.tools.auto_select {
            assistant =
                assistant.with_tool_selector(ToolSelector::new(Arc::clone(&services.generator)));
        }
        assistant
    }

    pub fn security(&self) -> &SecurityFilter {
        &self.security
    }

    pub fn chitchat(&self) -> Option<&ChitchatRouter> {
        self.chitchat.as_ref()
    }

    /// Build (or load) the reference corpora; returns (corpus id, phrases)
    pub async fn warm(&self, cancel: &CancellationToken) -> Result<Vec<(&'static str, usize)>> {
        let mut warmed = vec![(SECURITY_CORPUS_ID, self.security.warm(cancel).await?)];
        if let Some(router) = &self.chitchat {
            warmed.push((CHITCHAT_CORPUS_ID, router.warm(cancel).await?));
        }
        Ok(warmed)
    }

    pub async fn route_and_respond(&self, query: &str) -> Result<AssistantResponse> {
        self.route_and_respond_with(query, &CancellationToken::new())
            .await
    }

    /// Route one chat query. Only invalid input and cancellation are errors;
    /// upstream failures become [`AssistantResponse::Failed`].
    pub async fn route_and_respond_with(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<AssistantResponse> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AseguroError::InvalidInput("query is empty".to_string()));
        }

        if let Some(blocked) = self.screen_input(query, cancel).await? {
            return Ok(blocked);
        }

        if let Some(router) = &self.chitchat {
            match router.detect(query, cancel).await {
                Ok(result) => {
                    if let Some(intent) = result.label {
                        return Ok(AssistantResponse::Chitchat {
                            reply: router.reply(intent),
                            intent,
                            score: result.score,
                        });
                    }
                }
                Err(e @ AseguroError::Cancelled(_)) => return Err(e),
                Err(e) => tracing::warn!("Chitchat detection failed, continuing: {}", e),
            }
        }

        let choice = match &self.tools {
            Some(selector) => match selector.select(query, cancel).await {
                Ok(choice) => choice,
                Err(e @ AseguroError::Cancelled(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!("Tool selection failed, consulting policies: {}", e);
                    ToolChoice::ConsultPolicy
                }
            },
            None => ToolChoice::ConsultPolicy,
        };

        match choice {
            ToolChoice::ConsultPolicy => self.consult(query, cancel).await,
            ToolChoice::ComparePolicies { feature, insurers } => {
                self.run_comparison(&feature, &insurers, cancel).await
            }
        }
    }

    pub async fn compare(&self, feature: &str, insurers: &[String]) -> Result<AssistantResponse> {
        self.compare_with(feature, insurers, &CancellationToken::new())
            .await
    }

    /// Comparison entry point; the feature text passes the input gate first
    pub async fn compare_with(
        &self,
        feature: &str,
        insurers: &[String],
        cancel: &CancellationToken,
    ) -> Result<AssistantResponse> {
        if let Some(blocked) = self.screen_input(feature, cancel).await? {
            return Ok(blocked);
        }
        self.run_comparison(feature, insurers, cancel).await
    }

    async fn screen_input(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<AssistantResponse>> {
        Ok(match self.security.screen_input(text, cancel).await? {
            SecurityVerdict::Blocked(reason) => Some(self.blocked(reason)),
            SecurityVerdict::Allowed | SecurityVerdict::Degraded { .. } => None,
        })
    }

    async fn consult(&self, query: &str, cancel: &CancellationToken) -> Result<AssistantResponse> {
        match self.retrieval.answer(query, cancel).await {
            Ok(RetrievalOutcome::NoInformation) => Ok(AssistantResponse::NoInformation {
                text: NO_INFORMATION_MESSAGE.to_string(),
            }),
            Ok(RetrievalOutcome::Answer { text, sources, .. }) => {
                Ok(match self.security.screen_output(&text) {
                    Some(reason) => self.blocked(reason),
                    None => AssistantResponse::Answer { text, sources },
                })
            }
            Err(e) => self.failed(e),
        }
    }

    async fn run_comparison(
        &self,
        feature: &str,
        insurers: &[String],
        cancel: &CancellationToken,
    ) -> Result<AssistantResponse> {
        let outcome = match self.comparison.compare(feature, insurers, cancel).await {
            Ok(outcome) => outcome,
            Err(e @ AseguroError::InvalidInput(_)) => return Err(e),
            Err(e) => return self.failed(e),
        };

        if let ComparisonOutcome::Table(result) = &outcome {
            for row in &result.comparison {
                let screened = self
                    .security
                    .screen_output(&row.value)
                    .or_else(|| self.security.screen_output(&row.details));
                if let Some(reason) = screened {
                    return Ok(self.blocked(reason));
                }
            }
        }

        Ok(AssistantResponse::Comparison(outcome))
    }

    fn blocked(&self, reason: BlockReason) -> AssistantResponse {
        AssistantResponse::Blocked {
            reply: self.security.refusal(),
            reason,
        }
    }

    fn failed(&self, error: AseguroError) -> Result<AssistantResponse> {
        match error {
            AseguroError::Cancelled(_) => Err(error),
            other => {
                tracing::warn!("Pipeline failed: {}", other);
                Ok(AssistantResponse::Failed {
                    reason: other.to_string(),
                })
            }
        }
    }
}
