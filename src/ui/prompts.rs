//! Prompts with a non-interactive fallback

use super::context::UiContext;
use crate::error::{GistError, GistResult};

/// Yes/no question; `default` when there is no terminal to ask on
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> GistResult<bool> {
    if ctx.auto_yes() {
        return Ok(true);
    }
    if !ctx.is_interactive() {
        return Ok(default);
    }

    let message = message.to_string();
    tokio::task::spawn_blocking(move || {
        cliclack::confirm(&message).initial_value(default).interact()
    })
    .await
    .map_err(|e| GistError::Internal(format!("prompt task failed: {}", e)))?
    .map_err(|e| GistError::User(format!("Prompt failed: {}", e)))
}
