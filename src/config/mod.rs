//! Configuration management for gistpipe

pub mod schema;

pub use schema::Config;

use crate::error::{GistError, GistResult};
use schema::CacheConfig;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gistpipe")
            .join("config.toml")
    }

    /// Local cache directory, honouring `cache.dir`
    pub fn cache_dir(config: &CacheConfig) -> PathBuf {
        config.dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("gistpipe")
                .join("units")
        })
    }

    /// Load configuration, using defaults if the file does not exist
    pub async fn load(&self) -> GistResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> GistResult<Config> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| GistError::io(format!("reading config from {}", path.display()), e))?;

        toml::from_str(&content).map_err(|e| GistError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> GistResult<()> {
        let content = toml::to_string_pretty(config)?;
        self.write(&content).await?;
        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Set a dotted key (e.g. `cache.shared_url`) in place.
    ///
    /// The file is edited with `toml_edit` so comments and ordering are
    /// kept. The result must still parse as a valid `Config`.
    pub async fn set_value(&self, key: &str, value: &str) -> GistResult<Config> {
        let current = if self.config_path.exists() {
            fs::read_to_string(&self.config_path).await.map_err(|e| {
                GistError::io(format!("reading config from {}", self.config_path.display()), e)
            })?
        } else {
            toml::to_string_pretty(&Config::default())?
        };

        let updated = set_document_value(&current, key, value)?;
        let config: Config = toml::from_str(&updated).map_err(|e| GistError::ConfigInvalid {
            path: self.config_path.clone(),
            reason: format!("{} = {}: {}", key, value, e),
        })?;

        self.write(&updated).await?;
        info!("Set {} in {}", key, self.config_path.display());
        Ok(config)
    }

    async fn write(&self, content: &str) -> GistResult<()> {
        self.ensure_config_dir().await?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            GistError::io(format!("writing config to {}", self.config_path.display()), e)
        })
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> GistResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| GistError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply `key = value` to a TOML document, creating tables as needed
fn set_document_value(document: &str, key: &str, value: &str) -> GistResult<String> {
    let mut doc = document.parse::<toml_edit::DocumentMut>()?;

    let parts: Vec<&str> = key.split('.').collect();
    let Some((leaf, sections)) = parts.split_last() else {
        return Err(GistError::User(format!("Invalid config key: {}", key)));
    };
    if leaf.is_empty() || sections.iter().any(|s| s.is_empty()) {
        return Err(GistError::User(format!("Invalid config key: {}", key)));
    }

    let mut table = doc.as_table_mut();
    for section in sections {
        table = table
            .entry(section)
            .or_insert(toml_edit::table())
            .as_table_mut()
            .ok_or_else(|| GistError::User(format!("{} is not a table in {}", section, key)))?;
    }

    table.insert(leaf, parse_scalar(value));
    Ok(doc.to_string())
}

/// Interpret a CLI value as bool, integer, or string
fn parse_scalar(value: &str) -> toml_edit::Item {
    match value {
        "true" => toml_edit::value(true),
        "false" => toml_edit::value(false),
        _ => match value.parse::<i64>() {
            Ok(n) => toml_edit::value(n),
            Err(_) => toml_edit::value(value),
        },
    }
}
