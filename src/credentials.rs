//! Access token for publishing to the shared cache
//!
//! Resolution order: explicit config value, `GISTPIPE_TOKEN`, then the
//! GitHub CLI (`gh auth token`) when enabled. No token means read-only
//! use of the shared cache.

use crate::config::schema::CacheConfig;
use crate::error::{GistError, GistResult};
use std::fmt;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Environment variable consulted for the access token
pub const TOKEN_ENV: &str = "GISTPIPE_TOKEN";

/// An optional bearer credential
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AccessToken(Option<String>);

impl AccessToken {
    /// Wrap a token; empty strings count as absent
    pub fn new(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.trim().is_empty() {
            Self(None)
        } else {
            Self(Some(value.trim().to_string()))
        }
    }

    /// No credential held
    pub fn none() -> Self {
        Self(None)
    }

    /// The token, if one is held
    pub fn value(&self) -> Option<&str> {
        self.0.as_deref()
    }

    pub fn is_present(&self) -> bool {
        self.0.is_some()
    }

    /// Resolve the token from config, environment, then gh CLI
    pub async fn resolve(config: &CacheConfig) -> Self {
        if let Some(token) = config.token.as_deref() {
            let token = Self::new(token);
            if token.is_present() {
                debug!("Using access token from config");
                return token;
            }
        }

        if let Ok(value) = std::env::var(TOKEN_ENV) {
            let token = Self::new(value);
            if token.is_present() {
                debug!("Using access token from {}", TOKEN_ENV);
                return token;
            }
        }

        if config.use_gh_token {
            match gh_token().await {
                Ok(token) => {
                    debug!("Using access token from gh CLI");
                    return Self::new(token);
                }
                Err(e) => debug!("gh CLI token unavailable: {}", e),
            }
        }

        Self::none()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(_) => write!(f, "AccessToken(<redacted>)"),
            None => write!(f, "AccessToken(None)"),
        }
    }
}

/// Get a GitHub token from the gh CLI
async fn gh_token() -> GistResult<String> {
    let output = Command::new("gh")
        .args(["auth", "token"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| GistError::command_failed("gh auth token", e))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(GistError::User(format!("gh auth token failed: {}", stderr.trim())));
    }

    let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if token.is_empty() {
        return Err(GistError::User("gh auth token returned nothing".to_string()));
    }

    Ok(token)
}
