//! Configuration schema for gistpipe
//!
//! Configuration is stored at `~/.config/gistpipe/config.toml`

use crate::engine::DependencySpec;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Module loader bootstrap prepended to every bundle
pub const DEFAULT_MODULE_LOADER: &str =
    "https://cdn.jsdelivr.net/npm/dumber-module-loader@1.0.0/dist/index.min.js";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache settings
    pub cache: CacheConfig,

    /// Bundler settings
    pub bundler: BundlerConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// Cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Local cache directory (defaults to the platform cache dir)
    pub dir: Option<PathBuf>,

    /// Use the shared cache service for package units
    pub shared_enabled: bool,

    /// Shared cache service base URL
    pub shared_url: String,

    /// Shared cache request timeout
    pub timeout_secs: u64,

    /// Access token for publishing to the shared cache
    pub token: Option<String>,

    /// Fall back to `gh auth token` when no token is configured
    pub use_gh_token: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            shared_enabled: true,
            shared_url: "https://cache.gist.dumber.app".to_string(),
            timeout_secs: 10,
            token: None,
            use_gh_token: false,
        }
    }
}

/// Bundler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BundlerConfig {
    /// Module loader script prepended to the bundle
    pub module_loader: String,

    /// Entry bundle name, published at `/dist/<name>.js`
    pub bundle_name: String,

    /// CDN base for packages not found in the cache
    pub cdn_base: String,

    /// Dependencies every engine is configured with
    pub baseline_deps: Vec<DependencySpec>,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            module_loader: DEFAULT_MODULE_LOADER.to_string(),
            bundle_name: "entry-bundle".to_string(),
            cdn_base: "https://cdn.jsdelivr.net/npm".to_string(),
            baseline_deps: vec![DependencySpec {
                name: "vue".to_string(),
                main: Some("dist/vue.js".to_string()),
                lazy_main: true,
            }],
        }
    }
}

impl BundlerConfig {
    /// Publish path of the entry bundle
    pub fn bundle_path(&self) -> String {
        format!("/dist/{}.js", self.bundle_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bundle_path() {
        assert_eq!(BundlerConfig::default().bundle_path(), "/dist/entry-bundle.js");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: Config = toml::from_str("[cache]\nshared_enabled = false\n").unwrap();
        assert!(!config.cache.shared_enabled);
        assert_eq!(config.cache.timeout_secs, 10);
        assert_eq!(config.bundler.bundle_name, "entry-bundle");
        assert_eq!(config.general.log_format, "text");
    }

    #[test]
    fn baseline_deps_roundtrip() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.bundler, config.bundler);
    }
}
