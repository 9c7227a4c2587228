//! In-tree bundler engine
//!
//! Produces a single AMD bundle for a RequireJS-style module loader:
//! prepend scripts, cached package units, then the project's compiled
//! modules. Packages that are lazy or not cached are mapped to CDN URLs in
//! the loader config instead of being bundled.

use crate::cache::{content_hash, hash, CacheMeta};
use crate::config::schema::BundlerConfig;
use crate::engine::{
    amd, BundleArtifact, BundleOutput, BundlerEngine, DependencySpec, EngineFactory,
    EngineOptions, Unit,
};
use crate::error::{GistError, GistResult};
use crate::gist::SourceFile;
use crate::transpiler::TranspilerChain;
use async_trait::async_trait;
use futures_util::future::{join, join_all};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Bumped whenever compiled output changes shape, so old entries stop matching
const UNIT_CACHE_VERSION: &str = "unit:1";

/// Version used for packages with no declared range
const ANY_VERSION: &str = "latest";

/// Downloads prepend scripts that are not in the cache
#[async_trait]
pub trait ScriptFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> GistResult<String>;
}

/// Plain HTTP GET through `ureq`
pub struct HttpScriptFetcher {
    agent: ureq::Agent,
}

impl HttpScriptFetcher {
    pub fn new(timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();

        Self {
            agent: ureq::Agent::new_with_config(config),
        }
    }
}

#[async_trait]
impl ScriptFetcher for HttpScriptFetcher {
    async fn fetch(&self, url: &str) -> GistResult<String> {
        let url = url.to_string();
        let agent = self.agent.clone();
        debug!("GET {}", url);

        tokio::task::spawn_blocking(move || -> GistResult<String> {
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
        .map_err(|e| GistError::Internal(format!("fetch task failed: {}", e)))?
    }
}

/// Cached result of compiling one user file; `unit` is `None` for
/// files the chain passes through
#[derive(Debug, Serialize, Deserialize)]
struct CompiledEntry {
    #[serde(default)]
    unit: Option<Unit>,
}

/// A package or prepend script as stored in the cache
#[derive(Debug, Serialize, Deserialize)]
struct PackageEntry {
    #[serde(rename = "packageName")]
    package_name: String,
    contents: String,
}

#[derive(Debug, Clone, Default)]
struct Resolved {
    prepend: Vec<Unit>,
    packages: Vec<Unit>,
    modules: Vec<Unit>,
    paths: Map<String, Value>,
    deps: Vec<String>,
}

/// Builds `LocalEngine`s sharing one transpiler chain
pub struct LocalEngineFactory {
    chain: Arc<TranspilerChain>,
    fetcher: Option<Arc<dyn ScriptFetcher>>,
    bundle_name: String,
    module_loader: String,
}

impl LocalEngineFactory {
    pub fn new(chain: Arc<TranspilerChain>, bundler: &BundlerConfig) -> Self {
        Self {
            chain,
            fetcher: None,
            bundle_name: bundler.bundle_name.clone(),
            module_loader: bundler.module_loader.clone(),
        }
    }

    /// Allow downloading prepend scripts on a cache miss
    pub fn with_fetcher(mut self, fetcher: Arc<dyn ScriptFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }
}

impl EngineFactory for LocalEngineFactory {
    fn create(&self, mut options: EngineOptions) -> Box<dyn BundlerEngine> {
        if !options.skip_module_loader && !options.prepend.contains(&self.module_loader) {
            options.prepend.insert(0, self.module_loader.clone());
        }

        Box::new(LocalEngine::new(
            options,
            self.chain.clone(),
            self.fetcher.clone(),
            self.bundle_name.clone(),
        ))
    }
}

pub struct LocalEngine {
    options: EngineOptions,
    chain: Arc<TranspilerChain>,
    fetcher: Option<Arc<dyn ScriptFetcher>>,
    bundle_name: String,
    units: Vec<Unit>,
    resolved: Option<Resolved>,
}

impl LocalEngine {
    pub fn new(
        options: EngineOptions,
        chain: Arc<TranspilerChain>,
        fetcher: Option<Arc<dyn ScriptFetcher>>,
        bundle_name: impl Into<String>,
    ) -> Self {
        Self {
            options,
            chain,
            fetcher,
            bundle_name: bundle_name.into(),
            units: vec![],
            resolved: None,
        }
    }

    /// Captured units in capture order
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Compile one file, going through the local tier first
    async fn compile(&self, file: &SourceFile, files: &[SourceFile]) -> GistResult<Option<Unit>> {
        let key = unit_key(file, files);
        let cache = &self.options.cache;

        if let Some(value) = cache.get(&key, &CacheMeta::local()).await? {
            match serde_json::from_value::<CompiledEntry>(value) {
                Ok(entry) => {
                    debug!("Reusing compiled {} ({})", file.filename, hash::short(&key));
                    return Ok(entry.unit);
                }
                Err(e) => debug!("Ignoring bad cache entry for {}: {}", file.filename, e),
            }
        }

        let unit = self.chain.transpile(file, files)?.map(|result| Unit {
            path: result.filename,
            contents: result.content,
            module_id: result.module_id,
        });

        let entry = serde_json::to_value(CompiledEntry { unit: unit.clone() })?;
        if let Err(e) = cache.set(&key, &entry).await {
            warn!("Could not cache compiled {}: {}", file.filename, e);
        }

        Ok(unit)
    }

    /// Every package the bundle should know about
    fn packages(&self, implicit: &[String]) -> Vec<(DependencySpec, String)> {
        let mut specs: Vec<DependencySpec> = self.options.deps.clone();

        let declared = self.options.versions.keys().chain(implicit.iter());
        for name in declared {
            if !specs.iter().any(|s| &s.name == name) {
                specs.push(DependencySpec {
                    name: name.clone(),
                    main: None,
                    lazy_main: false,
                });
            }
        }

        specs
            .into_iter()
            .map(|spec| {
                let version = self
                    .options
                    .versions
                    .get(&spec.name)
                    .cloned()
                    .unwrap_or_else(|| ANY_VERSION.to_string());
                (spec, version)
            })
            .collect()
    }

    /// Cached package unit, or `None` when it must come from the CDN
    async fn resolve_package(&self, spec: &DependencySpec, version: &str) -> GistResult<Option<Unit>> {
        if spec.lazy_main {
            return Ok(None);
        }

        let key = content_hash(format!("{}@{}", spec.name, version));
        match self.options.cache.get(&key, &CacheMeta::package(&spec.name)).await {
            Ok(Some(value)) => {
                let entry: PackageEntry = serde_json::from_value(value)?;
                Ok(Some(Unit {
                    path: format!("{}@{}", spec.name, version),
                    contents: entry.contents,
                    module_id: Some(spec.name.clone()),
                }))
            }
            Ok(None) | Err(GistError::CacheMiss(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Prepend script from the cache, downloading and caching on a miss
    async fn resolve_prepend(&self, url: &str) -> GistResult<Option<Unit>> {
        let key = content_hash(format!("prepend:{}", url));
        let cache = &self.options.cache;

        let contents = match cache.get(&key, &CacheMeta::package(url)).await {
            Ok(Some(value)) => serde_json::from_value::<PackageEntry>(value)?.contents,
            Ok(None) | Err(GistError::CacheMiss(_)) => {
                let Some(fetcher) = &self.fetcher else {
                    warn!("{} is not cached and downloads are disabled, skipping", url);
                    return Ok(None);
                };
                let contents = match fetcher.fetch(url).await {
                    Ok(contents) => contents,
                    Err(e) => {
                        warn!("Could not download {}: {}", url, e);
                        return Ok(None);
                    }
                };

                let entry = serde_json::to_value(PackageEntry {
                    package_name: url.to_string(),
                    contents: contents.clone(),
                })?;
                if let Err(e) = cache.set(&key, &entry).await {
                    warn!("Could not cache {}: {}", url, e);
                }
                contents
            }
            Err(e) => return Err(e),
        };

        Ok(Some(Unit {
            path: url.to_string(),
            contents,
            module_id: None,
        }))
    }

    fn cdn_url(&self, spec: &DependencySpec, version: &str) -> String {
        let base = format!(
            "{}/{}@{}",
            self.options.cdn_base.trim_end_matches('/'),
            spec.name,
            version
        );
        match &spec.main {
            Some(main) => {
                let main = main.strip_suffix(".js").unwrap_or(main);
                format!("{}/{}", base, main.trim_start_matches("./"))
            }
            None => base,
        }
    }
}

#[async_trait]
impl BundlerEngine for LocalEngine {
    fn options(&self) -> &EngineOptions {
        &self.options
    }

    async fn capture(&mut self, unit: Unit) -> GistResult<()> {
        debug!("Capturing {}", unit.path);
        match self.units.iter_mut().find(|u| u.path == unit.path) {
            Some(existing) => *existing = unit,
            None => self.units.push(unit),
        }
        self.resolved = None;
        Ok(())
    }

    fn retain(&mut self, paths: &BTreeSet<String>) {
        let before = self.units.len();
        self.units.retain(|u| paths.contains(&u.path));
        if self.units.len() != before {
            debug!("Dropped {} stale units", before - self.units.len());
            self.resolved = None;
        }
    }

    async fn resolve(&mut self) -> GistResult<()> {
        let files: Vec<SourceFile> = self
            .units
            .iter()
            .map(|u| SourceFile::new(&u.path, &u.contents))
            .collect();

        let mut modules = vec![];
        for file in &files {
            if let Some(unit) = self.compile(file, &files).await? {
                modules.push(unit);
            }
        }

        let mut implicit = vec![];
        if let Some(finder) = self.options.deps_finder {
            let local_ids: BTreeSet<&str> =
                modules.iter().filter_map(|u| u.module_id.as_deref()).collect();
            for unit in &self.units {
                for dep in finder.find(unit) {
                    if !local_ids.contains(dep.as_str()) && !implicit.contains(&dep) {
                        implicit.push(dep);
                    }
                }
            }
        }

        let packages = self.packages(&implicit);
        let (package_units, prepend_units) = join(
            join_all(
                packages
                    .iter()
                    .map(|(spec, version)| self.resolve_package(spec, version)),
            ),
            join_all(self.options.prepend.iter().map(|url| self.resolve_prepend(url))),
        )
        .await;

        let mut resolved = Resolved {
            modules,
            deps: implicit,
            ..Resolved::default()
        };

        for ((spec, version), unit) in packages.iter().zip(package_units) {
            match unit? {
                Some(unit) => resolved.packages.push(unit),
                None => {
                    resolved
                        .paths
                        .insert(spec.name.clone(), Value::String(self.cdn_url(spec, version)));
                }
            }
        }
        for unit in prepend_units {
            if let Some(unit) = unit? {
                resolved.prepend.push(unit);
            }
        }

        info!(
            "Resolved {} modules, {} packages, {} from CDN",
            resolved.modules.len(),
            resolved.packages.len(),
            resolved.paths.len()
        );
        self.resolved = Some(resolved);
        Ok(())
    }

    async fn bundle(&mut self) -> GistResult<BundleOutput> {
        let Some(resolved) = &self.resolved else {
            return Err(GistError::Bundle("bundle requested before resolve".to_string()));
        };

        let mut files = resolved.prepend.clone();
        files.extend(resolved.packages.iter().cloned());
        files.extend(resolved.modules.iter().map(|unit| Unit {
            contents: amd::wrap(unit),
            ..unit.clone()
        }));

        let mut config = json!({
            "baseUrl": "/dist",
            "paths": resolved.paths.clone(),
        });
        if !resolved.deps.is_empty() {
            config["deps"] = json!(resolved.deps);
        }

        let mut output = BundleOutput::new();
        output.insert(self.bundle_name.clone(), BundleArtifact { files, config });
        Ok(output)
    }
}

/// Cache key for a compiled user file.
///
/// Sibling names are part of the key since they decide, for example,
/// whether an `.html` file is a component view.
fn unit_key(file: &SourceFile, files: &[SourceFile]) -> String {
    let mut listing = format!("{}\n{}|{}", UNIT_CACHE_VERSION, file.filename, file.content);
    for sibling in files {
        listing.push('\n');
        listing.push_str(&sibling.filename);
    }
    content_hash(listing)
}
