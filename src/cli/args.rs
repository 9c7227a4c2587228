//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// gistpipe - incremental build pipeline for gist previews
///
/// Loads a project directory as a gist, transpiles and bundles it, and
/// publishes a runnable preview.
#[derive(Parser, Debug)]
#[command(name = "gistpipe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "GISTPIPE_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a project directory into a preview
    Build(BuildArgs),

    /// Manage the local unit cache
    Cache(CacheArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Project directory
    pub dir: PathBuf,

    /// Output directory (defaults to DIR/.gistpipe-out)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Do not contact the shared cache or download scripts
    #[arg(long)]
    pub offline: bool,

    /// Keep compiled units in memory only
    #[arg(long)]
    pub no_cache: bool,
}

impl BuildArgs {
    pub fn out_dir(&self) -> PathBuf {
        self.out
            .clone()
            .unwrap_or_else(|| self.dir.join(".gistpipe-out"))
    }
}

#[derive(Parser, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Print the local cache directory
    Path,

    /// Remove every local entry
    Clear {
        /// Skip confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Show entry count and size
    Stats,
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write the default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Dotted key (e.g., cache.shared_url)
        key: String,
        /// Value to set
        value: String,
    },
}
