//! Terminal output for the CLI
//!
//! `cliclack` renders steps and prompts in a terminal; CI and piped output
//! get plain tagged lines instead.
//!
//! # Example
//!
//! ```rust,ignore
//! use gistpipe::ui::{self, UiContext, RenderProgress};
//!
//! let ctx = UiContext::detect();
//! ui::intro(&ctx, "gistpipe build");
//!
//! let progress = RenderProgress::new(&ctx, "my-gist");
//! progress.step("Building");
//! progress.finish();
//!
//! ui::outro_success(&ctx, "Built dist/entry-bundle.js");
//! ```

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{
    intro, key_value, outro_error, outro_success, remark, section, step_info, step_ok,
    step_ok_detail, step_warn,
};
pub use progress::{RenderProgress, TaskSpinner};
pub use prompts::confirm;
pub use theme::{init_theme, GistTheme};
