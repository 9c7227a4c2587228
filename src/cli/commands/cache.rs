//! Cache command - manage the local unit cache

use crate::cache::{FsLocalStore, LocalStore};
use crate::cli::args::{CacheAction, CacheArgs};
use crate::config::{Config, ConfigManager};
use crate::error::GistResult;
use crate::ui::{self, UiContext};

pub async fn execute(args: CacheArgs, config: &Config) -> GistResult<()> {
    let store = FsLocalStore::new(ConfigManager::cache_dir(&config.cache));

    match args.action {
        CacheAction::Path => {
            println!("{}", store.dir().display());
            Ok(())
        }
        CacheAction::Clear { yes } => clear(&store, yes).await,
        CacheAction::Stats => stats(&store, config).await,
    }
}

async fn clear(store: &FsLocalStore, yes: bool) -> GistResult<()> {
    let ctx = UiContext::detect().with_auto_yes(yes);

    let count = store.len().await?;
    if count == 0 {
        ui::step_info(&ctx, "Cache is already empty");
        return Ok(());
    }

    let prompt = format!("Remove {} cached entries?", count);
    if !ui::confirm(&ctx, &prompt, false).await? {
        ui::remark(&ctx, "Nothing removed. Use --yes to skip confirmation");
        return Ok(());
    }

    let removed = store.clear().await?;
    ui::step_ok_detail(
        &ctx,
        &format!("Removed {} entries", removed),
        &store.dir().display().to_string(),
    );
    Ok(())
}

async fn stats(store: &FsLocalStore, config: &Config) -> GistResult<()> {
    let ctx = UiContext::detect();
    let stats = store.stats().await?;

    ui::section(&ctx, "Local cache");
    ui::key_value(&ctx, "Directory", &store.dir().display().to_string());
    ui::key_value(&ctx, "Entries", &stats.entries.to_string());
    ui::key_value(&ctx, "Size", &format_bytes(stats.bytes));
    if let Some(newest) = stats.newest {
        ui::key_value(&ctx, "Last write", &newest.format("%Y-%m-%d %H:%M:%S UTC").to_string());
    }

    ui::section(&ctx, "Shared cache");
    if config.cache.shared_enabled {
        ui::key_value(&ctx, "URL", &config.cache.shared_url);
    } else {
        ui::key_value(&ctx, "URL", "disabled");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
