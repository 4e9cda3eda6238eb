//! Embedding cache over the file-backed store
//!
//! Tests:
//! 1. Idempotence: one embedding call per corpus
//! 2. Round-trip: reloaded vectors are bit-identical
//! 3. Corrupt files are regenerated and rewritten
//! 4. Concurrent first use embeds once

mod common;

use aseguro_core::cache::{CacheLookup, CacheStore, EmbeddingCache, FileCacheStore};
use aseguro_core::classify::{SecurityCorpus, SECURITY_CORPUS_ID};
use common::StubEmbedder;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn threat_texts() -> Vec<String> {
    SecurityCorpus::default()
        .threat_phrases()
        .into_iter()
        .map(|p| p.text)
        .collect()
}

#[tokio::test]
async fn test_get_or_build_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let embedder = Arc::new(StubEmbedder::for_default_corpora());
    let cache = EmbeddingCache::new(Arc::new(FileCacheStore::new(dir.path())), embedder.clone());
    let token = CancellationToken::new();
    let phrases = threat_texts();

    cache
        .get_or_build(SECURITY_CORPUS_ID, &phrases, &token)
        .await
        .unwrap();
    cache
        .get_or_build(SECURITY_CORPUS_ID, &phrases, &token)
        .await
        .unwrap();

    assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_reload_is_bit_identical() {
    let dir = TempDir::new().unwrap();
    let token = CancellationToken::new();
    let phrases = threat_texts();

    let first = EmbeddingCache::new(
        Arc::new(FileCacheStore::new(dir.path())),
        Arc::new(StubEmbedder::for_default_corpora()),
    );
    let built = first
        .get_or_build(SECURITY_CORPUS_ID, &phrases, &token)
        .await
        .unwrap();

    let embedder = Arc::new(StubEmbedder::for_default_corpora());
    let second = EmbeddingCache::new(Arc::new(FileCacheStore::new(dir.path())), embedder.clone());
    let loaded = second
        .get_or_build(SECURITY_CORPUS_ID, &phrases, &token)
        .await
        .unwrap();

    assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 0);
    assert_eq!(built.len(), loaded.len());
    for (a, b) in built.iter().zip(loaded.iter()) {
        let a_bits: Vec<u32> = a.iter().map(|f| f.to_bits()).collect();
        let b_bits: Vec<u32> = b.iter().map(|f| f.to_bits()).collect();
        assert_eq!(a_bits, b_bits);
    }
}

#[tokio::test]
async fn test_corrupt_file_is_regenerated() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(FileCacheStore::new(dir.path()));
    std::fs::write(store.path_for(SECURITY_CORPUS_ID), b"{ truncated").unwrap();

    let embedder = Arc::new(StubEmbedder::for_default_corpora());
    let cache = EmbeddingCache::new(store.clone(), embedder.clone());
    let vectors = cache
        .get_or_build(SECURITY_CORPUS_ID, &threat_texts(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(vectors.len(), threat_texts().len());
    assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 1);

    let CacheLookup::Hit(bytes) = store.read(SECURITY_CORPUS_ID).unwrap() else {
        panic!("cache file should have been rewritten");
    };
    let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(parsed["model"], "stub-anchors");
    assert_eq!(
        parsed["entries"].as_object().unwrap().len(),
        threat_texts().len()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_use_embeds_once() {
    let dir = TempDir::new().unwrap();
    let embedder = Arc::new(StubEmbedder::for_default_corpora());
    let cache = Arc::new(EmbeddingCache::new(
        Arc::new(FileCacheStore::new(dir.path())),
        embedder.clone(),
    ));
    let phrases = Arc::new(threat_texts());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let cache = cache.clone();
        let phrases = phrases.clone();
        handles.push(tokio::spawn(async move {
            cache
                .get_or_build(SECURITY_CORPUS_ID, &phrases, &CancellationToken::new())
                .await
                .map(|v| v.len())
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), phrases.len());
    }
    assert_eq!(embedder.batch_calls.load(Ordering::SeqCst), 1);
}
