//! Embedding cache for reference-phrase corpora

mod embedding_cache;
mod store;

pub use embedding_cache::{
    bytes_to_vector, phrase_hash, vector_to_bytes, EmbeddingCache, EmbeddingCacheStats,
};
pub use store::{CacheLookup, CacheStore, FileCacheStore, MemoryCacheStore};
