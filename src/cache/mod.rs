//! Two-tier content-addressable cache for compiled units
//!
//! Entries are keyed by a content hash computed by the caller, so an entry
//! never changes once written.
//!
//! # Tiers
//!
//! | Entry | Read | Write |
//! |-------|------|-------|
//! | Package unit (`packageName` set) | local, then shared | shared when a token is held, else local |
//! | User file | local only | local only |
//!
//! Shared-tier writes are best effort: they run in the background, and
//! failures are logged and dropped, since any client can rebuild a package
//! unit. `flush` waits for the ones still in flight. Local writes are the
//! system of record and propagate their errors. User source never leaves
//! the machine.

pub mod hash;
pub mod local;
pub mod shared;

pub use hash::{content_hash, files_hash};
pub use local::{FsLocalStore, LocalStore, MemoryLocalStore, StoreStats};
pub use shared::{HttpSharedCache, SharedCache};

use crate::config::schema::CacheConfig;
use crate::config::ConfigManager;
use crate::credentials::AccessToken;
use crate::error::{GistError, GistResult};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// JSON field marking an object as a package unit
pub const PACKAGE_NAME_FIELD: &str = "packageName";

/// Lookup metadata supplied with a cache read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheMeta {
    /// Set for third-party package units
    pub package_name: Option<String>,
}

impl CacheMeta {
    /// Metadata for a user file
    pub fn local() -> Self {
        Self::default()
    }

    /// Metadata for a package unit
    pub fn package(name: impl Into<String>) -> Self {
        Self {
            package_name: Some(name.into()),
        }
    }
}

/// Cache interface handed to bundler engines
#[async_trait]
pub trait CacheProvider: Send + Sync {
    /// Read an entry.
    ///
    /// Package lookups fail with `CacheMiss` when neither tier has the
    /// entry; user-file lookups return `Ok(None)`.
    async fn get(&self, hash: &str, meta: &CacheMeta) -> GistResult<Option<Value>>;

    /// Write an entry; tier selection follows the object's `packageName`
    async fn set(&self, hash: &str, object: &Value) -> GistResult<()>;
}

/// Package name carried by a cached object, if any
pub fn package_name(object: &Value) -> Option<&str> {
    object
        .get(PACKAGE_NAME_FIELD)
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
}

/// The two-tier cache
pub struct ContentCache {
    local: Arc<dyn LocalStore>,
    shared: Option<Arc<dyn SharedCache>>,
    token: AccessToken,
    /// Shared-tier writes still in flight
    pending: Mutex<JoinSet<()>>,
}

impl ContentCache {
    pub fn new(
        local: Arc<dyn LocalStore>,
        shared: Option<Arc<dyn SharedCache>>,
        token: AccessToken,
    ) -> Self {
        Self {
            local,
            shared,
            token,
            pending: Mutex::new(JoinSet::new()),
        }
    }

    /// Build the cache described by configuration.
    ///
    /// `offline` disables the shared tier; `ephemeral` swaps the
    /// filesystem store for an in-memory one.
    pub async fn from_config(config: &CacheConfig, offline: bool, ephemeral: bool) -> Self {
        let local: Arc<dyn LocalStore> = if ephemeral {
            Arc::new(MemoryLocalStore::new())
        } else {
            Arc::new(FsLocalStore::new(ConfigManager::cache_dir(config)))
        };

        let shared: Option<Arc<dyn SharedCache>> = if offline || !config.shared_enabled {
            None
        } else {
            Some(Arc::new(HttpSharedCache::new(
                config.shared_url.clone(),
                Duration::from_secs(config.timeout_secs),
            )))
        };

        let token = if shared.is_some() {
            AccessToken::resolve(config).await
        } else {
            AccessToken::none()
        };

        debug!(
            "Cache tiers: local{}, token {}",
            if shared.is_some() { " + shared" } else { "" },
            if token.is_present() { "present" } else { "absent" }
        );

        Self::new(local, shared, token)
    }

    pub fn local(&self) -> &Arc<dyn LocalStore> {
        &self.local
    }

    pub fn has_shared_tier(&self) -> bool {
        self.shared.is_some()
    }

    /// Wait for background shared-tier writes to finish
    pub async fn flush(&self) {
        let mut pending = std::mem::take(&mut *self.pending.lock().await);
        if !pending.is_empty() {
            debug!("Waiting for {} shared cache writes", pending.len());
        }
        while pending.join_next().await.is_some() {}
    }

    async fn get_package(&self, hash: &str, package: &str) -> GistResult<Option<Value>> {
        match self.local.get(hash).await {
            Ok(Some(value)) => {
                debug!("Local hit for {} ({})", hash::short(hash), package);
                return Ok(Some(value));
            }
            Ok(None) => {}
            Err(e) => debug!("Local read failed for {}: {}", hash::short(hash), e),
        }

        let Some(shared) = &self.shared else {
            return Err(GistError::CacheMiss(hash.to_string()));
        };

        match shared.fetch(hash).await {
            Ok(value) => {
                debug!("Shared hit for {} ({})", hash::short(hash), package);
                Ok(Some(value))
            }
            Err(e) => {
                debug!("Shared miss for {} ({}): {}", hash::short(hash), package, e);
                Err(GistError::CacheMiss(hash.to_string()))
            }
        }
    }
}

#[async_trait]
impl CacheProvider for ContentCache {
    async fn get(&self, hash: &str, meta: &CacheMeta) -> GistResult<Option<Value>> {
        match meta.package_name.as_deref() {
            Some(package) => self.get_package(hash, package).await,
            None => self.local.get(hash).await,
        }
    }

    async fn set(&self, hash: &str, object: &Value) -> GistResult<()> {
        if let (Some(package), Some(token), Some(shared)) =
            (package_name(object), self.token.value(), &self.shared)
        {
            let shared = shared.clone();
            let (token, hash, object) = (token.to_string(), hash.to_string(), object.clone());
            let package = package.to_string();
            self.pending.lock().await.spawn(async move {
                if let Err(e) = shared.store(&token, &hash, &object).await {
                    warn!(
                        "Shared cache write for {} ({}) dropped: {}",
                        hash::short(&hash),
                        package,
                        e
                    );
                }
            });
            return Ok(());
        }

        self.local.set(hash, object).await
    }
}
