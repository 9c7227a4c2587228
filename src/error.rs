//! Error types for gistpipe
//!
//! All modules use `GistResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for gistpipe operations
pub type GistResult<T> = Result<T, GistError>;

/// All errors that can occur in gistpipe
#[derive(Error, Debug)]
pub enum GistError {
    // Sequencing errors
    #[error("Build session is not initialised: call init before update or build")]
    Uninitialized,

    #[error("Build worker has shut down")]
    WorkerGone,

    // Build errors
    #[error("Failed to transpile {filename} ({stage}): {reason}")]
    Transpile {
        filename: String,
        stage: String,
        reason: String,
    },

    #[error("Bundle failed: {0}")]
    Bundle(String),

    // Cache errors
    #[error("Cache miss: {0}")]
    CacheMiss(String),

    #[error("Invalid cache key: {0}")]
    CacheKey(String),

    #[error("Storage error: {context}")]
    Storage {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Shared cache transport error: {0}")]
    Transport(String),

    // Edit session errors
    #[error("{0}")]
    Edit(String),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Invalid path: {path}: {reason}")]
    PathInvalid { path: PathBuf, reason: String },

    // Process errors
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("TOML edit error: {0}")]
    TomlEdit(#[from] toml_edit::TomlError),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl GistError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a local store error with context
    pub fn storage(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Storage {
            context: context.into(),
            source,
        }
    }

    /// Create a transpile error for a file and the stage that rejected it
    pub fn transpile(
        filename: impl Into<String>,
        stage: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::Transpile {
            filename: filename.into(),
            stage: stage.into(),
            reason: reason.into(),
        }
    }

    /// Create a command failed error
    pub fn command_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        Self::CommandFailed {
            command: command.into(),
            source,
        }
    }

    /// Whether the error is caused by user input and should be shown as-is.
    ///
    /// Everything else is a contract or environment failure.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::Transpile { .. } | Self::Edit(_) | Self::User(_) | Self::ConfigInvalid { .. }
        )
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::Uninitialized => Some("Send an init request before update or build"),
            Self::Transport(_) => Some("Retry with --offline to skip the shared cache"),
            Self::Storage { .. } => Some("Run: gistpipe cache clear"),
            Self::ConfigInvalid { .. } => Some("Run: gistpipe config init --force"),
            _ => None,
        }
    }
}
