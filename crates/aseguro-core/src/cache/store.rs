//! Persisted cache storage
//!
//! Absence is a normal outcome and is reported as [`CacheLookup::Miss`]
//! rather than an error; callers decide what a miss means.

use crate::error::Result;
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

/// Result of reading a cache key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    /// Stored bytes for the key
    Hit(Vec<u8>),
    /// Nothing stored under the key
    Miss,
}

/// Key/value byte storage for persisted caches
pub trait CacheStore: Send + Sync {
    fn read(&self, key: &str) -> Result<CacheLookup>;

    /// Replace the value under `key`. Readers never observe a partial value.
    fn write(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Remove `key`; returns whether anything was removed
    fn remove(&self, key: &str) -> Result<bool>;
}

/// One file per key inside a directory
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `key`
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_key(key)))
    }
}

impl CacheStore for FileCacheStore {
    fn read(&self, key: &str) -> Result<CacheLookup> {
        match std::fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(CacheLookup::Hit(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CacheLookup::Miss),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;

        // Temp file in the target directory so the rename stays on one filesystem.
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(self.path_for(key)).map_err(|e| e.error)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory store for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryCacheStore {
    fn read(&self, key: &str) -> Result<CacheLookup> {
        let entries = self
            .entries
            .read()
            .map_err(|_| crate::AseguroError::Cache("memory store lock poisoned".to_string()))?;
        Ok(match entries.get(key) {
            Some(bytes) => CacheLookup::Hit(bytes.clone()),
            None => CacheLookup::Miss,
        })
    }

    fn write(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| crate::AseguroError::Cache("memory store lock poisoned".to_string()))?;
        entries.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| crate::AseguroError::Cache("memory store lock poisoned".to_string()))?;
        Ok(entries.remove(key).is_some())
    }
}

/// Keep keys usable as file names
fn sanitize_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
