//! Config command - show or edit configuration

use crate::cli::args::{ConfigAction, ConfigArgs};
use crate::config::{Config, ConfigManager};
use crate::error::GistResult;
use crate::ui::{self, UiContext};

pub async fn execute(args: ConfigArgs, config: &Config, manager: &ConfigManager) -> GistResult<()> {
    match args.action {
        None | Some(ConfigAction::Show) => show_config(config)?,
        Some(ConfigAction::Path) => println!("{}", manager.path().display()),
        Some(ConfigAction::Init { force }) => init_config(manager, force).await?,
        Some(ConfigAction::Set { key, value }) => {
            manager.set_value(&key, &value).await?;
            ui::step_ok(&UiContext::detect(), &format!("Set {} = {}", key, value));
        }
    }

    Ok(())
}

fn show_config(config: &Config) -> GistResult<()> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

async fn init_config(manager: &ConfigManager, force: bool) -> GistResult<()> {
    let ctx = UiContext::detect().with_auto_yes(force);
    let path = manager.path();

    if path.exists() {
        let prompt = format!("Overwrite {}?", path.display());
        if !ui::confirm(&ctx, &prompt, false).await? {
            ui::step_warn(&ctx, &format!("Config already exists at {}", path.display()));
            ui::remark(&ctx, "Use --force to overwrite");
            return Ok(());
        }
    }

    manager.save(&Config::default()).await?;
    ui::step_ok_detail(&ctx, "Configuration initialized", &path.display().to_string());
    Ok(())
}
