//! SQLite-backed passage store
//!
//! Stores embeddings as BLOBs and computes cosine similarity in Rust.

use super::{PassageRecord, RetrievedPassage, SearchFilter, VectorStore};
use crate::cache::{bytes_to_vector, vector_to_bytes};
use crate::cancel::cancellable;
use crate::classify::cosine_similarity;
use crate::error::{AseguroError, Result};
use crate::llm::Embedder;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

const SCHEMA_VERSION: i32 = 1;

const EMBED_BATCH_SIZE: usize = 32;

const CREATE_TABLES: &str = r#"
CREATE TABLE IF NOT EXISTS passages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL,
    insurer TEXT NOT NULL,
    page TEXT,
    source TEXT,
    content_hash TEXT NOT NULL UNIQUE,
    model TEXT NOT NULL,
    embedding BLOB NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_passages_insurer ON passages(insurer);

CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY
);
"#;

/// Outcome of loading passages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub inserted: usize,
    pub skipped: usize,
}

/// Passage store in a single SQLite file
pub struct SqliteVectorStore {
    conn: Mutex<Connection>,
    embedder: Arc<dyn Embedder>,
}

impl SqliteVectorStore {
    /// Open (creating if needed) the store at `path`
    pub fn open(path: impl AsRef<Path>, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA busy_timeout = 5000;")?;
        Self::with_connection(conn, embedder)
    }

    pub fn open_in_memory(embedder: Arc<dyn Embedder>) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, embedder)
    }

    fn with_connection(conn: Connection, embedder: Arc<dyn Embedder>) -> Result<Self> {
        let store = Self {
            conn: Mutex::new(conn),
            embedder,
        };
        store.initialize()?;
        Ok(store)
    }

    /// Create tables when missing
    pub fn initialize(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(CREATE_TABLES)?;

        let version: Option<i32> = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get::<_, Option<i32>>(0)
            })
            .optional()?
            .flatten();

        match version {
            None => {
                conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?1)",
                    params![SCHEMA_VERSION],
                )?;
            }
            Some(v) if v > SCHEMA_VERSION => {
                return Err(AseguroError::Config(format!(
                    "passage database schema {} is newer than supported {}",
                    v, SCHEMA_VERSION
                )));
            }
            Some(_) => {}
        }
        Ok(())
    }

    /// Embed and store `records`, skipping passages already present
    pub async fn add_passages(
        &self,
        records: &[PassageRecord],
        cancel: &CancellationToken,
    ) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        let mut pending: Vec<(String, &PassageRecord)> = Vec::new();

        {
            let conn = self.conn()?;
            let mut stmt = conn.prepare("SELECT 1 FROM passages WHERE content_hash = ?1")?;
            for record in records {
                let hash = passage_hash(record);
                let exists = stmt.exists(params![hash])?;
                if exists || pending.iter().any(|(h, _)| *h == hash) {
                    report.skipped += 1;
                } else {
                    pending.push((hash, record));
                }
            }
        }

        let model = self.embedder.model_name().to_string();
        for batch in pending.chunks(EMBED_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|(_, r)| r.text.clone()).collect();
            let vectors = cancellable(
                cancel,
                "passage embedding",
                self.embedder.embed_batch(&texts),
            )
            .await?;
            if vectors.len() != texts.len() {
                return Err(AseguroError::Embedding(format!(
                    "requested {} embeddings, received {}",
                    texts.len(),
                    vectors.len()
                )));
            }

            let now = Utc::now().to_rfc3339();
            let mut conn = self.conn()?;
            let tx = conn.transaction()?;
            for ((hash, record), vector) in batch.iter().zip(&vectors) {
                let rows = tx.execute(
                    "INSERT OR IGNORE INTO passages
                     (text, insurer, page, source, content_hash, model, embedding, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        record.text,
                        record.insurer.to_uppercase(),
                        record.page,
                        record.source,
                        hash,
                        model,
                        vector_to_bytes(vector),
                        now
                    ],
                )?;
                if rows > 0 {
                    report.inserted += 1;
                } else {
                    report.skipped += 1;
                }
            }
            tx.commit()?;
            tracing::debug!(inserted = report.inserted, "passage batch stored");
        }

        tracing::info!(
            inserted = report.inserted,
            skipped = report.skipped,
            "passages loaded"
        );
        Ok(report)
    }

    /// Number of stored passages
    pub fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM passages", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Distinct insurer identifiers, sorted
    pub fn insurers(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT DISTINCT insurer FROM passages ORDER BY insurer")?;
        let insurers = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(insurers)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AseguroError::Other(anyhow::anyhow!("passage store lock poisoned")))
    }

    fn rank(
        &self,
        query_vector: &[f32],
        k: usize,
        filter: Option<&SearchFilter>,
    ) -> Result<Vec<RetrievedPassage>> {
        let conn = self.conn()?;
        let model = self.embedder.model_name();

        type Row = (String, String, Option<String>, Option<String>, Vec<u8>);
        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<Row> {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
        };

        let rows: Vec<Row> = match filter.and_then(|f| f.insurer.as_deref()) {
            Some(insurer) => {
                let mut stmt = conn.prepare(
                    "SELECT text, insurer, page, source, embedding FROM passages
                     WHERE model = ?1 AND insurer = ?2 ORDER BY id",
                )?;
                let rows = stmt
                    .query_map(params![model, insurer], map_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT text, insurer, page, source, embedding FROM passages
                     WHERE model = ?1 ORDER BY id",
                )?;
                let rows = stmt
                    .query_map(params![model], map_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };

        let mut scored: Vec<(f32, RetrievedPassage)> = rows
            .into_iter()
            .filter_map(|(text, insurer, page, source, blob)| {
                let embedding = bytes_to_vector(&blob)?;
                if embedding.len() != query_vector.len() {
                    return None;
                }
                let score = cosine_similarity(query_vector, &embedding);
                Some((
                    score,
                    RetrievedPassage {
                        text,
                        insurer,
                        page,
                        source,
                        rank_score: Some(score),
                    },
                ))
            })
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored.into_iter().map(|(_, p)| p).collect())
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&SearchFilter>,
        cancel: &CancellationToken,
    ) -> Result<Vec<RetrievedPassage>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let query_vector = cancellable(cancel, "query embedding", self.embedder.embed(query)).await?;
        let passages = self.rank(&query_vector, k, filter)?;
        tracing::debug!(
            k,
            insurer = filter.and_then(|f| f.insurer.as_deref()),
            found = passages.len(),
            "vector search"
        );
        Ok(passages)
    }
}

/// Content hash identifying a passage for deduplication
fn passage_hash(record: &PassageRecord) -> String {
    let mut hasher = Sha256::new();
    hasher.update(record.insurer.to_uppercase().as_bytes());
    hasher.update([0u8]);
    hasher.update(record.page.as_deref().unwrap_or("").as_bytes());
    hasher.update([0u8]);
    hasher.update(record.text.as_bytes());
    format!("{:x}", hasher.finalize())
}
