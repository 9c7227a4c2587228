//! Publish targets: where built output is served from

use crate::error::{GistError, GistResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use tokio::fs;
use tracing::debug;

/// Path of the preview document
pub const ROOT_PATH: &str = "/";

pub const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";
pub const CONTENT_TYPE_JS: &str = "application/javascript";

/// Keyed file store the preview reads from
#[async_trait]
pub trait PublishTarget: Send + Sync {
    async fn write(&self, path: &str, content: &str, content_type: &str) -> GistResult<()>;
}

/// Writes into a directory; `/` maps to `index.html`
pub struct DirPublishTarget {
    root: PathBuf,
}

impl DirPublishTarget {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem location of a publish path
    pub fn file_path(&self, path: &str) -> GistResult<PathBuf> {
        let relative = match path.trim_start_matches('/') {
            "" => "index.html",
            rest => rest,
        };

        let relative = Path::new(relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(GistError::PathInvalid {
                path: relative.to_path_buf(),
                reason: "publish paths must stay inside the output directory".to_string(),
            });
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl PublishTarget for DirPublishTarget {
    async fn write(&self, path: &str, content: &str, content_type: &str) -> GistResult<()> {
        let target = self.file_path(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| GistError::io(format!("creating {}", parent.display()), e))?;
        }

        fs::write(&target, content)
            .await
            .map_err(|e| GistError::io(format!("writing {}", target.display()), e))?;
        debug!("Published {} ({}, {} bytes)", path, content_type, content.len());
        Ok(())
    }
}

/// Published entry: content and content type
pub type PublishedEntry = (String, String);

/// In-memory target
#[derive(Default)]
pub struct MemoryPublishTarget {
    entries: Mutex<BTreeMap<String, PublishedEntry>>,
}

impl MemoryPublishTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<PublishedEntry> {
        self.entries.lock().ok()?.get(path).cloned()
    }

    /// Snapshot of everything published so far
    pub fn entries(&self) -> BTreeMap<String, PublishedEntry> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PublishTarget for MemoryPublishTarget {
    async fn write(&self, path: &str, content: &str, content_type: &str) -> GistResult<()> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| GistError::Internal("publish target lock poisoned".to_string()))?;
        entries.insert(
            path.to_string(),
            (content.to_string(), content_type.to_string()),
        );
        Ok(())
    }
}
