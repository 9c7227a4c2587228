//! gistpipe - incremental build pipeline for gist previews
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use gistpipe::cli::commands;
use gistpipe::cli::{Cli, Commands};
use gistpipe::config::{Config, ConfigManager};
use gistpipe::error::GistResult;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> GistResult<()> {
    let cli = Cli::parse();

    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = manager.load().await?;

    init_logging(cli.verbose, &config);
    gistpipe::ui::init_theme();
    debug!("Using config {}", manager.path().display());

    match cli.command {
        Commands::Build(args) => commands::build(args, &config).await,
        Commands::Cache(args) => commands::cache(args, &config).await,
        Commands::Config(args) => commands::config(args, &config, &manager).await,
    }
}

/// 0 = warn, 1 = info, 2+ = debug. `general.verbose` counts as one `-v`.
fn init_logging(verbose: u8, config: &Config) {
    let level = verbose.saturating_add(u8::from(config.general.verbose));
    let filter = match level {
        0 => EnvFilter::new("gistpipe=warn"),
        1 => EnvFilter::new("gistpipe=info"),
        _ => EnvFilter::new("gistpipe=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.without_time().init();
    }
}
