//! Vector store of insurer-tagged policy passages
//!
//! Provides:
//! - The [`VectorStore`] seam used by the retrieval and comparison pipelines
//! - A SQLite-backed implementation with embeddings stored as BLOBs
//! - A JSON-lines loader for pre-chunked passages

mod sqlite;

pub use sqlite::{IngestReport, SqliteVectorStore};

use crate::error::{AseguroError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::io::BufRead;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// A passage returned by a similarity search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub text: String,
    pub insurer: String,
    pub page: Option<String>,
    pub source: Option<String>,
    /// Similarity to the query, when the store reports one
    pub rank_score: Option<f32>,
}

/// Exact-match metadata predicate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    pub insurer: Option<String>,
}

impl SearchFilter {
    pub fn insurer(insurer: impl Into<String>) -> Self {
        Self {
            insurer: Some(insurer.into()),
        }
    }
}

/// Similarity search over stored passages
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Up to `k` passages ranked by similarity to `query`; fewer when the
    /// matching corpus is small.
    async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&SearchFilter>,
        cancel: &CancellationToken,
    ) -> Result<Vec<RetrievedPassage>>;
}

/// One pre-chunked passage as produced by an ingestion job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassageRecord {
    pub text: String,
    pub insurer: String,
    #[serde(default, deserialize_with = "page_as_string")]
    pub page: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

fn page_as_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

/// Read passages from a JSON-lines file, one record per non-blank line
pub fn load_passages_jsonl(path: impl AsRef<Path>) -> Result<Vec<PassageRecord>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            AseguroError::NotFound(format!("passage file {}", path.display()))
        }
        _ => e.into(),
    })?;
    let reader = std::io::BufReader::new(file);

    let mut records = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let mut record: PassageRecord = serde_json::from_str(trimmed).map_err(|e| {
            AseguroError::Parse(format!("{}:{}: {}", path.display(), line_no + 1, e))
        })?;
        record.insurer = record.insurer.trim().to_uppercase();
        if record.text.trim().is_empty() || record.insurer.is_empty() {
            tracing::warn!(line = line_no + 1, "Skipping passage without text or insurer");
            continue;
        }
        records.push(record);
    }

    Ok(records)
}
