//! Bundler engine abstraction
//!
//! The session manager drives an engine through three steps: `capture`
//! each source unit, `resolve` dependencies, then `bundle`. This trait lets
//! the session work with any engine; `LocalEngine` is the in-tree one.

pub mod amd;
pub mod aurelia;
pub mod local;

pub use local::{HttpScriptFetcher, LocalEngine, LocalEngineFactory, ScriptFetcher};

use crate::cache::CacheProvider;
use crate::error::GistResult;
use crate::gist::SourceFile;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// A source unit handed to, or produced by, an engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Unit {
    pub path: String,
    pub contents: String,
    /// Registered module id; `None` for pass-through files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_id: Option<String>,
}

impl From<&SourceFile> for Unit {
    fn from(file: &SourceFile) -> Self {
        Self {
            path: file.filename.clone(),
            contents: file.content.clone(),
            module_id: None,
        }
    }
}

/// A package the engine should make available
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySpec {
    pub name: String,

    /// Entry file inside the package
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,

    /// Load from the CDN on first use instead of bundling
    #[serde(default)]
    pub lazy_main: bool,
}

/// Framework-specific implicit dependency discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepsFinder {
    /// Aurelia 1 conventions: `PLATFORM.moduleName()` and `<require from>`
    Aurelia1,
}

impl DepsFinder {
    /// Implicit dependencies referenced by a compiled unit
    pub fn find(&self, unit: &Unit) -> Vec<String> {
        match self {
            Self::Aurelia1 => aurelia::find_deps(&unit.path, &unit.contents),
        }
    }
}

/// Everything an engine instance is constructed with
#[derive(Clone)]
pub struct EngineOptions {
    /// Do not inject the engine's own module loader
    pub skip_module_loader: bool,
    pub deps_finder: Option<DepsFinder>,
    pub cache: Arc<dyn CacheProvider>,
    /// Script URLs placed before all modules
    pub prepend: Vec<String>,
    pub deps: Vec<DependencySpec>,
    /// Package version ranges, from package.json
    pub versions: BTreeMap<String, String>,
    pub cdn_base: String,
}

impl fmt::Debug for EngineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineOptions")
            .field("skip_module_loader", &self.skip_module_loader)
            .field("deps_finder", &self.deps_finder)
            .field("prepend", &self.prepend)
            .field("deps", &self.deps)
            .field("versions", &self.versions)
            .field("cdn_base", &self.cdn_base)
            .finish_non_exhaustive()
    }
}

/// One output bundle: its units in load order plus loader config
#[derive(Debug, Clone, PartialEq)]
pub struct BundleArtifact {
    pub files: Vec<Unit>,
    pub config: Value,
}

/// Bundles keyed by entry name
pub type BundleOutput = BTreeMap<String, BundleArtifact>;

/// A module bundler instance
#[async_trait]
pub trait BundlerEngine: Send {
    /// Options this instance was created with
    fn options(&self) -> &EngineOptions;

    /// Add or replace a source unit
    async fn capture(&mut self, unit: Unit) -> GistResult<()>;

    /// Drop captured units whose path is not in `paths`
    fn retain(&mut self, paths: &BTreeSet<String>);

    /// Compile captured units and resolve their dependencies
    async fn resolve(&mut self) -> GistResult<()>;

    /// Produce the bundles
    async fn bundle(&mut self) -> GistResult<BundleOutput>;
}

/// Creates engine instances for the session manager
pub trait EngineFactory: Send + Sync {
    fn create(&self, options: EngineOptions) -> Box<dyn BundlerEngine>;
}
