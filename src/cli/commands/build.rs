//! Build command - render a project directory into a preview

use crate::cache::ContentCache;
use crate::cli::args::BuildArgs;
use crate::config::Config;
use crate::edit::EditSession;
use crate::engine::{HttpScriptFetcher, LocalEngineFactory};
use crate::error::GistResult;
use crate::gist::Gist;
use crate::session::{DirPublishTarget, SessionManager};
use crate::transpiler::TranspilerChain;
use crate::ui::{self, RenderProgress, TaskSpinner, UiContext};
use crate::worker::BuildWorker;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub async fn execute(args: BuildArgs, config: &Config) -> GistResult<()> {
    let ctx = UiContext::detect();
    let out = args.out_dir();
    ui::intro(&ctx, "gistpipe build");

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Loading {}", args.dir.display()));
    let gist = match Gist::load_dir(&args.dir, Some(&out)).await {
        Ok(gist) => {
            spinner.stop(&format!("Loaded {} files", gist.files.len()));
            gist
        }
        Err(e) => {
            spinner.stop_error("Could not load project");
            return Err(e);
        }
    };

    let cache = Arc::new(ContentCache::from_config(&config.cache, args.offline, args.no_cache).await);
    let mut factory = LocalEngineFactory::new(Arc::new(TranspilerChain::new()), &config.bundler);
    if !args.offline {
        factory = factory.with_fetcher(Arc::new(HttpScriptFetcher::new(Duration::from_secs(
            config.cache.timeout_secs,
        ))));
    }

    let session = SessionManager::new(
        Arc::new(factory),
        Arc::new(DirPublishTarget::new(&out)),
        config.bundler.clone(),
    );
    let worker = BuildWorker::spawn(session, cache.clone());
    debug!("Publishing into {}", out.display());

    let mut edit = EditSession::new();
    edit.load_gist(gist);

    let label = match edit.gist().description.as_str() {
        "" => "gist".to_string(),
        name => name.to_string(),
    };
    let progress = RenderProgress::new(&ctx, &label);
    progress.step("transpiling and bundling");
    let result = edit.render(&worker).await;
    progress.finish();
    cache.flush().await;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            ui::outro_error(&ctx, "Build failed");
            return Err(e);
        }
    };

    ui::step_ok_detail(
        &ctx,
        &format!("Built {}", config.bundler.bundle_path().trim_start_matches('/')),
        &format!("{:.1} secs", outcome.elapsed.as_secs_f64()),
    );
    ui::key_value(&ctx, "Output", &out.display().to_string());
    ui::key_value(&ctx, "Hash", crate::cache::hash::short(&outcome.hash));
    ui::outro_success(&ctx, "Preview ready");

    Ok(())
}
