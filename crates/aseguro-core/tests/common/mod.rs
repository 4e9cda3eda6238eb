//! Stub collaborators shared by the integration tests

#![allow(dead_code)]

use aseguro_core::cache::MemoryCacheStore;
use aseguro_core::classify::{ChitchatCorpus, SecurityCorpus};
use aseguro_core::config::RetrievalConfig;
use aseguro_core::{
    AseguroError, Assistant, ChatMessage, ChitchatRouter, ComparisonPipeline, Embedder,
    EmbeddingCache, Generator, Result, RetrievalPipeline, RetrievedPassage, SearchFilter,
    SecurityFilter, ToolSelector, VectorStore,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn contains_sequence(haystack: &[String], needle: &[String]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Embeds text onto "anchor" axes.
///
/// The longest anchor phrase contained in the text (as a token sequence)
/// gets weight 1.0, other contained anchors 0.25. Text without anchors
/// lands on a separate fallback axis.
pub struct StubEmbedder {
    anchors: Vec<Vec<String>>,
    pub batch_calls: AtomicUsize,
    pub single_calls: AtomicUsize,
    pub fail: bool,
}

impl StubEmbedder {
    pub fn new(anchors: &[String]) -> Self {
        Self {
            anchors: anchors.iter().map(|a| tokens(a)).collect(),
            batch_calls: AtomicUsize::new(0),
            single_calls: AtomicUsize::new(0),
            fail: false,
        }
    }

    /// Anchors for every phrase of the default corpora
    pub fn for_default_corpora() -> Self {
        let security = SecurityCorpus::default();
        let chitchat = ChitchatCorpus::default();
        let mut anchors: Vec<String> = security
            .threat_phrases()
            .into_iter()
            .map(|p| p.text)
            .collect();
        anchors.extend(chitchat.texts());
        Self::new(&anchors)
    }

    pub fn failing() -> Self {
        let mut embedder = Self::for_default_corpora();
        embedder.fail = true;
        embedder
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let text_tokens = tokens(text);
        let mut v = vec![0.0; self.anchors.len() + 1];

        let matched: Vec<usize> = self
            .anchors
            .iter()
            .enumerate()
            .filter(|(_, anchor)| contains_sequence(&text_tokens, anchor))
            .map(|(i, _)| i)
            .collect();

        if matched.is_empty() {
            v[self.anchors.len()] = 1.0;
            return v;
        }

        let longest = matched
            .iter()
            .copied()
            .max_by_key(|&i| (self.anchors[i].len(), std::cmp::Reverse(i)))
            .unwrap_or(matched[0]);
        for i in matched {
            v[i] = if i == longest { 1.0 } else { 0.25 };
        }
        v
    }
}

#[async_trait]
impl Embedder for StubEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.single_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AseguroError::ExternalError("embedding quota exceeded".into()));
        }
        Ok(self.vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(AseguroError::ExternalError("embedding quota exceeded".into()));
        }
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.anchors.len() + 1
    }

    fn model_name(&self) -> &str {
        "stub-anchors"
    }
}

/// Kind of generation call, recognised from the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Rerank,
    Answer,
    ToolSelection,
    Comparison,
}

fn call_kind(prompt: &str) -> CallKind {
    if prompt.contains("Herramientas disponibles") {
        CallKind::ToolSelection
    } else if prompt.contains("índices de los") {
        CallKind::Rerank
    } else if prompt.contains("extraer y comparar") {
        CallKind::Comparison
    } else {
        CallKind::Answer
    }
}

/// Generator with one scripted reply per call kind; unscripted kinds fail
#[derive(Default)]
pub struct StubGenerator {
    replies: HashMap<CallKind, String>,
    calls: Mutex<Vec<(CallKind, String)>>,
}

impl StubGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(mut self, kind: CallKind, text: impl Into<String>) -> Self {
        self.replies.insert(kind, text.into());
        self
    }

    pub fn calls(&self, kind: CallKind) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .count()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_prompt(&self, kind: CallKind) -> Option<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(k, _)| *k == kind)
            .map(|(_, p)| p.clone())
    }
}

#[async_trait]
impl Generator for StubGenerator {
    async fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        let prompt = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let kind = call_kind(&prompt);
        self.calls.lock().unwrap().push((kind, prompt));
        self.replies
            .get(&kind)
            .cloned()
            .ok_or_else(|| AseguroError::Llm(format!("no scripted reply for {:?}", kind)))
    }

    fn model_name(&self) -> &str {
        "stub-generator"
    }
}

/// Vector store returning fixed passages, filtered by insurer
#[derive(Default)]
pub struct StubVectorStore {
    passages: Vec<RetrievedPassage>,
    pub searches: AtomicUsize,
    pub filters: Mutex<Vec<Option<String>>>,
}

impl StubVectorStore {
    pub fn new(passages: Vec<RetrievedPassage>) -> Self {
        Self {
            passages,
            ..Default::default()
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorStore for StubVectorStore {
    async fn search(
        &self,
        _query: &str,
        k: usize,
        filter: Option<&SearchFilter>,
        _cancel: &CancellationToken,
    ) -> Result<Vec<RetrievedPassage>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        let insurer = filter.and_then(|f| f.insurer.clone());
        self.filters.lock().unwrap().push(insurer.clone());

        Ok(self
            .passages
            .iter()
            .filter(|p| insurer.as_ref().map_or(true, |i| &p.insurer == i))
            .take(k)
            .cloned()
            .collect())
    }
}

pub fn passage(text: &str, insurer: &str, page: &str) -> RetrievedPassage {
    RetrievedPassage {
        text: text.to_string(),
        insurer: insurer.to_string(),
        page: Some(page.to_string()),
        source: None,
        rank_score: None,
    }
}

/// Numbered passages "pasaje 0".."pasaje {n-1}" for one insurer
pub fn numbered_passages(n: usize, insurer: &str) -> Vec<RetrievedPassage> {
    (0..n)
        .map(|i| passage(&format!("pasaje {}", i), insurer, &i.to_string()))
        .collect()
}

/// Fully wired assistant over stubs
pub struct Harness {
    pub embedder: Arc<StubEmbedder>,
    pub generator: Arc<StubGenerator>,
    pub store: Arc<StubVectorStore>,
    pub cache: Arc<EmbeddingCache>,
    pub assistant: Assistant,
}

pub struct HarnessOptions {
    pub embedder: StubEmbedder,
    pub fail_closed: bool,
    pub chitchat: bool,
    pub tool_selection: bool,
}

impl Default for HarnessOptions {
    fn default() -> Self {
        Self {
            embedder: StubEmbedder::for_default_corpora(),
            fail_closed: true,
            chitchat: true,
            tool_selection: false,
        }
    }
}

impl Harness {
    pub fn new(store: StubVectorStore, generator: StubGenerator) -> Self {
        Self::with_options(store, generator, HarnessOptions::default())
    }

    pub fn with_options(
        store: StubVectorStore,
        generator: StubGenerator,
        options: HarnessOptions,
    ) -> Self {
        let embedder = Arc::new(options.embedder);
        let generator = Arc::new(generator);
        let store = Arc::new(store);
        let cache = Arc::new(EmbeddingCache::new(
            Arc::new(MemoryCacheStore::new()),
            embedder.clone(),
        ));

        let security = SecurityFilter::new(SecurityCorpus::default(), cache.clone(), 0.82)
            .with_fail_closed(options.fail_closed)
            .with_seed(Some(42));
        let retrieval =
            RetrievalPipeline::new(store.clone(), generator.clone(), RetrievalConfig::default());
        let comparison = ComparisonPipeline::new(store.clone(), generator.clone(), 5);

        let mut assistant = Assistant::new(security, retrieval, comparison);
        if options.chitchat {
            assistant = assistant.with_chitchat(
                ChitchatRouter::new(ChitchatCorpus::default(), cache.clone(), 0.85)
                    .with_seed(Some(43)),
            );
        }
        if options.tool_selection {
            assistant = assistant.with_tool_selector(ToolSelector::new(generator.clone()));
        }

        Self {
            embedder,
            generator,
            store,
            cache,
            assistant,
        }
    }
}
