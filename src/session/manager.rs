//! Session lifecycle: init, update, build

use crate::cache::CacheProvider;
use crate::config::schema::BundlerConfig;
use crate::engine::{BundleArtifact, BundlerEngine, DepsFinder, EngineFactory, EngineOptions, Unit};
use crate::error::{GistError, GistResult};
use crate::gist::SourceFile;
use crate::session::publish::{PublishTarget, CONTENT_TYPE_HTML, CONTENT_TYPE_JS, ROOT_PATH};
use crate::session::state::{
    ActiveSession, InitOutcome, SessionConfig, DEFAULT_BUNDLE_JS, DEFAULT_INDEX_HTML,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

/// The project's own preview document
const INDEX_FILE: &str = "index.html";

/// Owns the engine instance and replaces it when the session config changes
pub struct SessionManager {
    factory: Arc<dyn EngineFactory>,
    publish: Arc<dyn PublishTarget>,
    bundler: BundlerConfig,
    active: Option<ActiveSession>,
}

impl SessionManager {
    pub fn new(
        factory: Arc<dyn EngineFactory>,
        publish: Arc<dyn PublishTarget>,
        bundler: BundlerConfig,
    ) -> Self {
        Self {
            factory,
            publish,
            bundler,
            active: None,
        }
    }

    pub fn is_initialised(&self) -> bool {
        self.active.is_some()
    }

    /// Config of the current instance
    pub fn config(&self) -> Option<&SessionConfig> {
        self.active.as_ref().map(|a| &a.config)
    }

    /// The current engine instance
    pub fn instance(&self) -> Option<&dyn BundlerEngine> {
        self.active.as_ref().map(|a| a.instance.as_ref())
    }

    /// Create an engine for `config` unless the current one already matches.
    ///
    /// A new engine also resets the published preview to the defaults.
    pub async fn init(
        &mut self,
        config: SessionConfig,
        cache: Arc<dyn CacheProvider>,
    ) -> GistResult<InitOutcome> {
        if self.config() == Some(&config) {
            debug!("Session config unchanged, keeping engine");
            return Ok(InitOutcome { is_new: false });
        }

        let options = EngineOptions {
            skip_module_loader: true,
            deps_finder: config.is_aurelia1.then_some(DepsFinder::Aurelia1),
            cache,
            prepend: vec![self.bundler.module_loader.clone()],
            deps: self.bundler.baseline_deps.clone(),
            versions: config.deps.clone(),
            cdn_base: self.bundler.cdn_base.clone(),
        };

        let replacing = self.active.is_some();
        let instance = self.factory.create(options);
        self.active = Some(ActiveSession { config, instance });
        info!(
            "{} bundler engine",
            if replacing { "Replaced" } else { "Created" }
        );

        self.publish
            .write(ROOT_PATH, DEFAULT_INDEX_HTML, CONTENT_TYPE_HTML)
            .await?;
        self.publish
            .write(&self.bundler.bundle_path(), DEFAULT_BUNDLE_JS, CONTENT_TYPE_JS)
            .await?;

        Ok(InitOutcome { is_new: true })
    }

    /// Feed a full file snapshot to the engine; `index.html` is published
    /// directly. Units from earlier snapshots that are no longer present are
    /// dropped, so the next build matches exactly these files.
    ///
    /// Returns the files the engine captured.
    pub async fn update(&mut self, files: Vec<SourceFile>) -> GistResult<Vec<SourceFile>> {
        let active = self.active.as_mut().ok_or(GistError::Uninitialized)?;

        let (index, others): (Vec<_>, Vec<_>) =
            files.into_iter().partition(|f| f.filename == INDEX_FILE);

        for file in &others {
            active.instance.capture(Unit::from(file)).await?;
        }
        let paths: BTreeSet<String> = others.iter().map(|f| f.filename.clone()).collect();
        active.instance.retain(&paths);

        if let Some(index) = index.last() {
            self.publish
                .write(ROOT_PATH, &index.content, CONTENT_TYPE_HTML)
                .await?;
        }

        debug!("Captured {} files", others.len());
        Ok(others)
    }

    /// Resolve, bundle and publish the entry bundle
    pub async fn build(&mut self) -> GistResult<()> {
        let active = self.active.as_mut().ok_or(GistError::Uninitialized)?;

        active.instance.resolve().await?;
        let mut output = active.instance.bundle().await?;

        let artifact = output.remove(&self.bundler.bundle_name).ok_or_else(|| {
            GistError::Bundle(format!("no {} in bundler output", self.bundler.bundle_name))
        })?;

        let bundle = render_bundle(&artifact)?;
        self.publish
            .write(&self.bundler.bundle_path(), &bundle, CONTENT_TYPE_JS)
            .await?;

        info!(
            "Published {} ({} units)",
            self.bundler.bundle_path(),
            artifact.files.len()
        );
        Ok(())
    }
}

/// Unit contents joined by newlines, then the loader config call
pub fn render_bundle(artifact: &BundleArtifact) -> GistResult<String> {
    let contents: Vec<&str> = artifact.files.iter().map(|u| u.contents.as_str()).collect();
    let config = serde_json::to_string_pretty(&artifact.config)?;
    Ok(format!(
        "{}\nrequirejs.config({});",
        contents.join("\n"),
        config
    ))
}
