//! Local cache tier
//!
//! The local store is the system of record for compiled user files: writes
//! must succeed or fail loudly. Reads of corrupt entries degrade to misses.

use crate::error::{GistError, GistResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tokio::fs;
use tracing::debug;

/// Durable key-value storage for cached artifacts
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Read an entry, `None` when absent
    async fn get(&self, hash: &str) -> GistResult<Option<Value>>;

    /// Write an entry, replacing any previous value
    async fn set(&self, hash: &str, value: &Value) -> GistResult<()>;

    /// Remove every entry, returning how many were removed
    async fn clear(&self) -> GistResult<usize>;

    /// Number of stored entries
    async fn len(&self) -> GistResult<usize>;
}

/// On-disk record wrapping a cached value
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    stored_at: DateTime<Utc>,
    value: Value,
}

/// Filesystem-backed store, one JSON file per hash
pub struct FsLocalStore {
    dir: PathBuf,
}

impl FsLocalStore {
    /// Create a store rooted at `dir` (created lazily on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the entries
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, hash: &str) -> GistResult<PathBuf> {
        validate_key(hash)?;
        Ok(self.dir.join(format!("{}.json", hash)))
    }

    async fn entries(&self) -> GistResult<Vec<PathBuf>> {
        if !self.dir.exists() {
            return Ok(vec![]);
        }

        let mut paths = vec![];
        let mut entries = fs::read_dir(&self.dir)
            .await
            .map_err(|e| GistError::storage("reading cache directory", e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| GistError::storage("reading cache entry", e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }

        Ok(paths)
    }

    /// Entry count, total bytes and the newest write time
    pub async fn stats(&self) -> GistResult<StoreStats> {
        let mut stats = StoreStats::default();

        for path in self.entries().await? {
            let content = fs::read_to_string(&path)
                .await
                .map_err(|e| GistError::storage(format!("reading {}", path.display()), e))?;

            stats.entries += 1;
            stats.bytes += content.len() as u64;
            if let Ok(entry) = serde_json::from_str::<StoredEntry>(&content) {
                stats.newest = stats.newest.max(Some(entry.stored_at));
            }
        }

        Ok(stats)
    }
}

/// Summary of an `FsLocalStore`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub entries: usize,
    pub bytes: u64,
    pub newest: Option<DateTime<Utc>>,
}

#[async_trait]
impl LocalStore for FsLocalStore {
    async fn get(&self, hash: &str) -> GistResult<Option<Value>> {
        let path = self.entry_path(hash)?;

        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)
            .await
            .map_err(|e| GistError::storage(format!("reading {}", path.display()), e))?;

        match serde_json::from_str::<StoredEntry>(&content) {
            Ok(entry) => Ok(Some(entry.value)),
            Err(e) => {
                debug!("Ignoring corrupt cache entry {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    async fn set(&self, hash: &str, value: &Value) -> GistResult<()> {
        let path = self.entry_path(hash)?;

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| GistError::storage("creating cache directory", e))?;

        let entry = StoredEntry {
            stored_at: Utc::now(),
            value: value.clone(),
        };
        let content = serde_json::to_string(&entry)?;

        // Write-then-rename so readers never see a torn entry
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)
            .await
            .map_err(|e| GistError::storage(format!("writing {}", tmp.display()), e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| GistError::storage(format!("renaming {}", tmp.display()), e))?;

        Ok(())
    }

    async fn clear(&self) -> GistResult<usize> {
        let paths = self.entries().await?;
        for path in &paths {
            fs::remove_file(path)
                .await
                .map_err(|e| GistError::storage(format!("removing {}", path.display()), e))?;
        }
        Ok(paths.len())
    }

    async fn len(&self) -> GistResult<usize> {
        Ok(self.entries().await?.len())
    }
}

/// In-memory store, used for `--no-cache` builds and tests
#[derive(Default)]
pub struct MemoryLocalStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> GistResult<std::sync::MutexGuard<'_, HashMap<String, Value>>> {
        self.entries
            .lock()
            .map_err(|_| GistError::Internal("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl LocalStore for MemoryLocalStore {
    async fn get(&self, hash: &str) -> GistResult<Option<Value>> {
        Ok(self.lock()?.get(hash).cloned())
    }

    async fn set(&self, hash: &str, value: &Value) -> GistResult<()> {
        self.lock()?.insert(hash.to_string(), value.clone());
        Ok(())
    }

    async fn clear(&self) -> GistResult<usize> {
        let mut entries = self.lock()?;
        let count = entries.len();
        entries.clear();
        Ok(count)
    }

    async fn len(&self) -> GistResult<usize> {
        Ok(self.lock()?.len())
    }
}

/// Keys become file names, so only hash-like characters are allowed
fn validate_key(hash: &str) -> GistResult<()> {
    let valid = !hash.is_empty()
        && hash
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(())
    } else {
        Err(GistError::CacheKey(hash.to_string()))
    }
}
