//! Shared (remote) cache tier
//!
//! Content-addressed store for package units, shared by every client.
//! Reads are anonymous; writes carry the caller's access token.

use crate::error::{GistError, GistResult};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Remote cache service interface
#[async_trait]
pub trait SharedCache: Send + Sync {
    /// Fetch an object by hash; a missing object is an error
    async fn fetch(&self, hash: &str) -> GistResult<Value>;

    /// Publish an object under `hash`
    async fn store(&self, token: &str, hash: &str, object: &Value) -> GistResult<()>;
}

#[derive(Serialize)]
struct StoreRequest<'a> {
    token: &'a str,
    hash: &'a str,
    object: &'a Value,
}

/// HTTP client for the shared cache service
///
/// `GET <base>/<hash>` returns the JSON object; `POST <base>` stores one.
/// `ureq` is blocking, so every call runs on the blocking pool.
pub struct HttpSharedCache {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpSharedCache {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();

        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent: ureq::Agent::new_with_config(config),
        }
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl SharedCache for HttpSharedCache {
    async fn fetch(&self, hash: &str) -> GistResult<Value> {
        let url = format!("{}/{}", self.base_url, hash);
        let agent = self.agent.clone();
        debug!("GET {}", url);

        let body = tokio::task::spawn_blocking(move || -> GistResult<String> {
            let mut response = agent
                .get(&url)
                .call()
                .map_err(|e| GistError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(GistError::Transport(format!("GET {} returned {}", url, status)));
            }

            response
                .body_mut()
                .read_to_string()
                .map_err(|e| GistError::Transport(e.to_string()))
        })
        .await
        .map_err(|e| GistError::Internal(format!("shared cache task failed: {}", e)))??;

        Ok(serde_json::from_str(&body)?)
    }

    async fn store(&self, token: &str, hash: &str, object: &Value) -> GistResult<()> {
        let body = serde_json::to_string(&StoreRequest {
            token,
            hash,
            object,
        })?;
        let url = self.base_url.clone();
        let agent = self.agent.clone();
        debug!("POST {}", url);

        tokio::task::spawn_blocking(move || -> GistResult<()> {
            let response = agent
                .post(&url)
                .header("Content-Type", "application/json; charset=utf-8")
                .send(body.as_str())
                .map_err(|e| GistError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(GistError::Transport(format!("POST {} returned {}", url, status)));
            }
            Ok(())
        })
        .await
        .map_err(|e| GistError::Internal(format!("shared cache task failed: {}", e)))?
    }
}
