//! Short-lived memo of query embeddings
//!
//! One inbound query is embedded by the security gate and again by the
//! chitchat router; the memo turns the second request into a lookup.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

const DEFAULT_TTL: Duration = Duration::from_secs(300);
const DEFAULT_CAPACITY: usize = 1024;

#[derive(Clone)]
struct MemoEntry {
    vector: Vec<f32>,
    expires_at: Instant,
}

/// In-memory TTL memo for single-text embeddings
pub struct EmbeddingMemo {
    entries: RwLock<HashMap<String, MemoEntry>>,
    ttl: Duration,
    capacity: usize,
}

impl EmbeddingMemo {
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
            capacity: DEFAULT_CAPACITY,
        }
    }

    /// Get memoized vector if present and not expired
    pub fn get(&self, key: &str) -> Option<Vec<f32>> {
        let entries = self.entries.read().ok()?;
        let entry = entries.get(key)?;

        if Instant::now() < entry.expires_at {
            Some(entry.vector.clone())
        } else {
            None
        }
    }

    pub fn set(&self, key: String, vector: Vec<f32>) {
        let Ok(mut entries) = self.entries.write() else {
            return;
        };

        let now = Instant::now();
        if entries.len() >= self.capacity {
            entries.retain(|_, e| now < e.expires_at);
        }
        if entries.len() >= self.capacity {
            // Still full of live entries: start over rather than grow unbounded.
            entries.clear();
        }

        entries.insert(
            key,
            MemoEntry {
                vector,
                expires_at: now + self.ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EmbeddingMemo {
    fn default() -> Self {
        Self::new()
    }
}

/// Memo key for an embedding of `text` under `model`
pub fn embedding_memo_key(model: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(model.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    format!("embed:{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memo_basic() {
        let memo = EmbeddingMemo::new();
        memo.set("k1".to_string(), vec![1.0, 2.0]);
        assert_eq!(memo.get("k1"), Some(vec![1.0, 2.0]));
        assert_eq!(memo.get("k2"), None);
        assert_eq!(memo.len(), 1);
    }

    #[test]
    fn test_memo_expiry() {
        let memo = EmbeddingMemo::with_ttl(Duration::from_millis(50));
        memo.set("k1".to_string(), vec![0.5]);
        assert!(memo.get("k1").is_some());

        std::thread::sleep(Duration::from_millis(80));
        assert!(memo.get("k1").is_none());
    }

    #[test]
    fn test_memo_key_generation() {
        let a = embedding_memo_key("model", "hola");
        let b = embedding_memo_key("model", "hola");
        let c = embedding_memo_key("model", "adios");
        let d = embedding_memo_key("other", "hola");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }
}
