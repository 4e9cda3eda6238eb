//! Persisted embeddings for fixed reference-phrase corpora
//!
//! Each corpus is stored under its own key as a JSON document whose entries
//! are keyed by the SHA-256 of the phrase text, so editing or reordering a
//! corpus can never pair a phrase with another phrase's vector.

use super::store::{CacheLookup, CacheStore};
use crate::cancel::cancellable;
use crate::error::{AseguroError, Result};
use crate::llm::Embedder;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio_util::sync::CancellationToken;

const CACHE_FORMAT_VERSION: u32 = 1;

/// On-disk layout of one corpus cache
#[derive(Debug, Serialize, Deserialize)]
struct CorpusCacheFile {
    version: u32,
    model: String,
    dimensions: usize,
    created_at: String,
    /// phrase hash -> base64 of little-endian f32 bytes
    entries: BTreeMap<String, String>,
}

/// Counters describing cache behaviour since construction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingCacheStats {
    /// Corpora served entirely from persisted entries
    pub storage_hits: u64,
    /// Corpora that needed an embedding call
    pub regenerations: u64,
    /// Phrases sent to the embedding service
    pub embedded_phrases: u64,
    /// Persistence attempts that failed and were ignored
    pub write_failures: u64,
}

#[derive(Default)]
struct Counters {
    storage_hits: AtomicU64,
    regenerations: AtomicU64,
    embedded_phrases: AtomicU64,
    write_failures: AtomicU64,
}

struct MemoizedCorpus {
    fingerprint: String,
    vectors: Arc<Vec<Vec<f32>>>,
}

/// Read-mostly embedding cache shared by the classifiers
pub struct EmbeddingCache {
    store: Arc<dyn CacheStore>,
    embedder: Arc<dyn Embedder>,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    memo: RwLock<HashMap<String, MemoizedCorpus>>,
    counters: Counters,
}

impl EmbeddingCache {
    pub fn new(store: Arc<dyn CacheStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            store,
            embedder,
            locks: Mutex::new(HashMap::new()),
            memo: RwLock::new(HashMap::new()),
            counters: Counters::default(),
        }
    }

    /// Embedder used for cold corpora
    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Vectors for `phrases`, aligned 1:1 with the input order.
    ///
    /// Persisted entries are reused; only phrases without an entry are sent
    /// to the embedding service, in a single batch. Persistence failures are
    /// logged and ignored, and unreadable cache data counts as a miss.
    pub async fn get_or_build(
        &self,
        corpus_id: &str,
        phrases: &[String],
        cancel: &CancellationToken,
    ) -> Result<Arc<Vec<Vec<f32>>>> {
        if phrases.is_empty() {
            return Ok(Arc::new(Vec::new()));
        }

        let fingerprint = corpus_fingerprint(self.embedder.model_name(), phrases);
        if let Some(vectors) = self.memoized(corpus_id, &fingerprint) {
            return Ok(vectors);
        }

        let lock = self.corpus_lock(corpus_id);
        let _guard = lock.lock().await;

        // Another task may have populated the corpus while we waited.
        if let Some(vectors) = self.memoized(corpus_id, &fingerprint) {
            return Ok(vectors);
        }

        let model = self.embedder.model_name().to_string();
        let dimensions = self.embedder.dimensions();
        let mut entries = self.load_entries(corpus_id, &model, dimensions);

        let hashes: Vec<String> = phrases.iter().map(|p| phrase_hash(p)).collect();
        let mut missing: Vec<(String, String)> = Vec::new();
        for (phrase, hash) in phrases.iter().zip(&hashes) {
            if !entries.contains_key(hash) && !missing.iter().any(|(h, _)| h == hash) {
                missing.push((hash.clone(), phrase.clone()));
            }
        }

        let embedded_now = !missing.is_empty();
        if embedded_now {
            self.counters.regenerations.fetch_add(1, Ordering::Relaxed);
            tracing::info!(
                corpus = corpus_id,
                missing = missing.len(),
                total = phrases.len(),
                "generating reference embeddings"
            );

            let texts: Vec<String> = missing.iter().map(|(_, p)| p.clone()).collect();
            let vectors = cancellable(
                cancel,
                "reference embedding",
                self.embedder.embed_batch(&texts),
            )
            .await?;

            if vectors.len() != texts.len() {
                return Err(AseguroError::Embedding(format!(
                    "corpus '{}': requested {} embeddings, received {}",
                    corpus_id,
                    texts.len(),
                    vectors.len()
                )));
            }
            if let Some(bad) = vectors.iter().find(|v| v.len() != dimensions) {
                return Err(AseguroError::Embedding(format!(
                    "corpus '{}': model '{}' returned {} dimensions, expected {} \
                     (set llm_service.embedding_dimensions)",
                    corpus_id,
                    model,
                    bad.len(),
                    dimensions
                )));
            }
            self.counters
                .embedded_phrases
                .fetch_add(texts.len() as u64, Ordering::Relaxed);

            for ((hash, _), vector) in missing.into_iter().zip(vectors) {
                entries.insert(hash, vector);
            }
        } else {
            self.counters.storage_hits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(corpus = corpus_id, "reference embeddings loaded from cache");
        }

        let mut ordered = Vec::with_capacity(hashes.len());
        for hash in &hashes {
            let vector = entries.get(hash).cloned().ok_or_else(|| {
                AseguroError::Cache(format!("corpus '{}': no entry for {}", corpus_id, hash))
            })?;
            ordered.push(vector);
        }

        if embedded_now {
            self.persist(corpus_id, &model, dimensions, &hashes, &ordered);
        }

        let vectors = Arc::new(ordered);
        if let Ok(mut memo) = self.memo.write() {
            memo.insert(
                corpus_id.to_string(),
                MemoizedCorpus {
                    fingerprint,
                    vectors: Arc::clone(&vectors),
                },
            );
        }

        Ok(vectors)
    }

    /// Drop the persisted and memoized copies of a corpus
    pub fn invalidate(&self, corpus_id: &str) -> Result<bool> {
        if let Ok(mut memo) = self.memo.write() {
            memo.remove(corpus_id);
        }
        self.store.remove(corpus_id)
    }

    pub fn stats(&self) -> EmbeddingCacheStats {
        EmbeddingCacheStats {
            storage_hits: self.counters.storage_hits.load(Ordering::Relaxed),
            regenerations: self.counters.regenerations.load(Ordering::Relaxed),
            embedded_phrases: self.counters.embedded_phrases.load(Ordering::Relaxed),
            write_failures: self.counters.write_failures.load(Ordering::Relaxed),
        }
    }

    fn memoized(&self, corpus_id: &str, fingerprint: &str) -> Option<Arc<Vec<Vec<f32>>>> {
        let memo = self.memo.read().ok()?;
        memo.get(corpus_id)
            .filter(|m| m.fingerprint == fingerprint)
            .map(|m| Arc::clone(&m.vectors))
    }

    fn corpus_lock(&self, corpus_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = match self.locks.lock() {
            Ok(locks) => locks,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(locks.entry(corpus_id.to_string()).or_default())
    }

    fn load_entries(
        &self,
        corpus_id: &str,
        model: &str,
        dimensions: usize,
    ) -> HashMap<String, Vec<f32>> {
        let bytes = match self.store.read(corpus_id) {
            Ok(CacheLookup::Hit(bytes)) => bytes,
            Ok(CacheLookup::Miss) => return HashMap::new(),
            Err(e) => {
                tracing::warn!(corpus = corpus_id, "Cache unreadable, regenerating: {}", e);
                return HashMap::new();
            }
        };

        match decode_cache_file(&bytes, model, dimensions) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(corpus = corpus_id, "Cache discarded: {}", e);
                HashMap::new()
            }
        }
    }

    fn persist(
        &self,
        corpus_id: &str,
        model: &str,
        dimensions: usize,
        hashes: &[String],
        vectors: &[Vec<f32>],
    ) {
        let file = CorpusCacheFile {
            version: CACHE_FORMAT_VERSION,
            model: model.to_string(),
            dimensions,
            created_at: Utc::now().to_rfc3339(),
            entries: hashes
                .iter()
                .zip(vectors)
                .map(|(h, v)| (h.clone(), BASE64.encode(vector_to_bytes(v))))
                .collect(),
        };

        let result = serde_json::to_vec(&file)
            .map_err(AseguroError::from)
            .and_then(|bytes| self.store.write(corpus_id, &bytes));

        if let Err(e) = result {
            self.counters.write_failures.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(corpus = corpus_id, "Could not persist embedding cache: {}", e);
        }
    }
}

/// SHA-256 of a reference phrase
pub fn phrase_hash(phrase: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(phrase.as_bytes());
    format!("{:x}", hasher.finalize())
}

fn corpus_fingerprint(model: &str, phrases: &[String]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    for phrase in phrases {
        hasher.update([0u8]);
        hasher.update(phrase.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

fn decode_cache_file(
    bytes: &[u8],
    model: &str,
    dimensions: usize,
) -> Result<HashMap<String, Vec<f32>>> {
    let file: CorpusCacheFile = serde_json::from_slice(bytes)?;

    if file.version != CACHE_FORMAT_VERSION {
        return Err(AseguroError::Cache(format!(
            "unsupported cache version {}",
            file.version
        )));
    }
    if file.model != model {
        return Err(AseguroError::Cache(format!(
            "cache built with model '{}', current model is '{}'",
            file.model, model
        )));
    }
    if file.dimensions != dimensions {
        return Err(AseguroError::Cache(format!(
            "cache holds {}-dimensional vectors, model produces {}",
            file.dimensions, dimensions
        )));
    }

    let mut entries = HashMap::with_capacity(file.entries.len());
    for (hash, encoded) in file.entries {
        let raw = BASE64
            .decode(encoded.as_bytes())
            .map_err(|e| AseguroError::Cache(format!("entry {}: {}", hash, e)))?;
        let vector = bytes_to_vector(&raw)
            .ok_or_else(|| AseguroError::Cache(format!("entry {} is truncated", hash)))?;
        if vector.len() != file.dimensions {
            return Err(AseguroError::Cache(format!(
                "entry {} has {} dimensions, expected {}",
                hash,
                vector.len(),
                file.dimensions
            )));
        }
        entries.insert(hash, vector);
    }

    Ok(entries)
}

/// Convert f32 vector to bytes (little-endian)
pub fn vector_to_bytes(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Convert little-endian bytes back to an f32 vector; `None` if truncated
pub fn bytes_to_vector(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}
